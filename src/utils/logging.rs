//! Tracing subscriber setup for binaries and examples.

use tracing_subscriber::EnvFilter;

use crate::config::LOG_ENV_VAR;

/// Install the global tracing subscriber.
///
/// The filter comes from `CAREPOST_LOG` (falling back to `info`); repeated
/// calls are no-ops so test binaries can call this freely.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
