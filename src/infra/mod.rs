//! Infrastructure adapters: console and file sinks.

pub mod sink;

pub use sink::{ConsoleSink, RetainedConsole, RollingFileSink};
