//! # Logging Bootstrap
//!
//! The subsystems only emit `tracing` events. Applications that have no
//! subscriber of their own can install one from the `log` section of the
//! client config; `RUST_LOG` overrides the configured level.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `lc_02_tx_dispatcher=debug,info`.
    pub level: String,
    /// One JSON object per line instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter `{directive}`: {reason}")]
    Filter { directive: String, reason: String },

    /// Another global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Filter from `RUST_LOG`, else from the configured directive.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::Filter {
            directive: config.level.clone(),
            reason: e.to_string(),
        })
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    result.map_err(|e| LoggingError::Install(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(LogConfig::default().level, "info");
    }

    #[test]
    fn test_directive_accepted() {
        let config = LogConfig {
            level: "lc_01_connection_pool=debug,warn".into(),
            json: false,
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let first = init(&config);
        let second = init(&config);
        // a test harness subscriber may already be present, so only the
        // second call is certain to fail
        assert!(first.is_ok() || second.is_err());
        assert!(matches!(second, Err(LoggingError::Install(_))));
    }
}
