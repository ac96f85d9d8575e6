//! Process-wide lifecycle of the execution core.

pub mod execution_core;

pub use execution_core::ExecutionCore;
