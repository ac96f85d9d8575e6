//! Destinations for rendered log text.

pub mod console;
pub mod file;

pub use console::{RetainedConsole, DEFAULT_MAX_LINES};
pub use file::RollingFileSink;

/// A console view the pipeline writes rendered records to.
///
/// The pipeline has no UI toolkit dependency. A GUI, TUI or test harness
/// registers an implementation; calls arrive on the consumer thread (or, in
/// the overflow path, on a producer thread) one at a time.
pub trait ConsoleSink: Send + Sync {
    /// Append rendered text. May contain several newline-terminated lines.
    fn append(&self, text: &str);

    /// Remove everything currently shown.
    fn clear(&self);

    /// Release UI resources. Called once when the pipeline shuts down.
    fn dispose(&self) {}
}
