//! Telemetry helpers for the crate's own lifecycle diagnostics.

use tracing_subscriber::EnvFilter;

/// Install a default env-filtered `tracing` subscriber writing to stderr.
///
/// Does nothing if the application already installed a global subscriber.
/// Records routed through the [`LogPipeline`](crate::core::LogPipeline) are
/// unaffected by this; it only controls where the pipeline and scheduler
/// report their own start, stop and resize events.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
