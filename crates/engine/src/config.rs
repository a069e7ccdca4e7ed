// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine Configuration
//!
//! Settings an embedder may pass when creating an [`Engine`](crate::Engine).
//! All fields have defaults, so an empty JSON object or YAML document is a
//! valid configuration.
//!
//! ## Example
//!
//! ```rust
//! use sqlscript_engine::EngineConfig;
//!
//! let config = EngineConfig::from_yaml_str("maxCompletionCandidates: 10").unwrap();
//! assert_eq!(config.max_completion_candidates, 10);
//! assert_eq!(config.log_filter, "info");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the engine section in embedder settings
pub const SETTINGS_KEY: &str = "sqlscript";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Database assumed for unqualified table names
    pub default_database_name: String,

    /// Schema assumed for unqualified table names
    pub default_schema_name: String,

    /// Upper bound for the candidate limit of a completion request
    pub max_completion_candidates: usize,

    /// Only report registry column info for scripts analyzed against the
    /// current catalog version
    pub strict_registry_versions: bool,

    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_database_name: String::new(),
            default_schema_name: String::new(),
            max_completion_candidates: 32,
            strict_registry_versions: false,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_default_names(
        mut self,
        database_name: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        self.default_database_name = database_name.into();
        self.default_schema_name = schema_name.into();
        self
    }

    pub fn with_max_completion_candidates(mut self, limit: usize) -> Self {
        self.max_completion_candidates = limit;
        self
    }

    pub fn with_strict_registry_versions(mut self, strict: bool) -> Self {
        self.strict_registry_versions = strict;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_completion_candidates == 0 {
            return Err(ConfigError::InvalidCandidateLimit);
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the `sqlscript` section of embedder settings
    ///
    /// Expected format:
    /// ```json
    /// {
    ///   "sqlscript": {
    ///     "defaultSchemaName": "public",
    ///     "maxCompletionCandidates": 20
    ///   }
    /// }
    /// ```
    ///
    /// Returns `Ok(None)` when the section is missing.
    pub fn from_settings(settings: &Value) -> Result<Option<Self>, ConfigError> {
        let Some(section) = settings.get(SETTINGS_KEY) else {
            return Ok(None);
        };
        let config: Self = serde_json::from_value(section.clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(Some(config))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("maxCompletionCandidates must be at least 1")]
    InvalidCandidateLimit,

    #[error("Log filter must not be empty")]
    EmptyLogFilter,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),

    /// A global subscriber was installed before
    #[error("Logging is already initialized")]
    LoggingAlreadyInitialized,
}
