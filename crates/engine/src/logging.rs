// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Logging setup for binaries and embedders.
//!
//! The library itself only emits `tracing` events. Installing a subscriber
//! is left to whoever owns the process.

use crate::config::{ConfigError, EngineConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Build the filter, `RUST_LOG` takes precedence over the configuration
pub fn env_filter(config: &EngineConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .map_err(|e| ConfigError::InvalidLogFilter(e.to_string())),
    }
}

/// Install a global fmt subscriber writing to stderr
pub fn init_logging(config: &EngineConfig) -> Result<(), ConfigError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(config)?)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| ConfigError::LoggingAlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_filter_is_accepted() {
        let config = EngineConfig::default().with_log_filter("sqlscript_engine=debug");
        assert!(env_filter(&config).is_ok());
    }
}
