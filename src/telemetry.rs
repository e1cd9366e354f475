//! Tracing subscriber setup for the delivery binaries.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::ParseError};

use crate::config::{AppConfig, LogFormat};

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `LOG_FILTER` holds an invalid directive.
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Installs the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter directives cannot be parsed
/// or a subscriber is already installed.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match config.log_format {
        LogFormat::Json => builder.json().try_init()?,
        LogFormat::Text => builder.compact().try_init()?,
    }
    Ok(())
}
