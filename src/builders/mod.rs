//! Builders to assemble the execution core from configuration.

pub mod core_builder;

pub use core_builder::ExecutionCoreBuilder;
