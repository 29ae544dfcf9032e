//! Optional `tracing` subscriber bootstrap
//!
//! Applications that already install their own subscriber leave
//! `LoggingSettings::install_subscriber` off; the agent then only emits events.

use crate::config::{LogFormat, LoggingSettings, DEFAULT_LOG_LEVEL};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber for the given settings
///
/// Returns `false` when a global subscriber was already installed; that case
/// is not an error because only one subscriber can exist per process.
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let filter =
        EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let result = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Tracing subscriber already installed");
            false
        }
    }
}
