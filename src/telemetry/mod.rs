//! Logging initialization.
//!
//! Installs a tracing-subscriber registry with an env filter and a fmt
//! layer. `RUST_LOG` takes precedence over the configured level.

pub mod resolve;

use crate::error::{Error, Result};

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info").
    pub level: String,
    /// Write compact single-line events.
    pub compact: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            compact: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber was already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.compact {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))
}
