//! Engine configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `METERING` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_engine::config::EngineConfig;
//!
//! let config = EngineConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod policies;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ConfigValidationError};
pub use policies::{load_policy_catalogue, PolicyFile};

use serde::Deserialize;

/// Root engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Database configuration (PostgreSQL connection).
    pub database: DatabaseConfig,

    /// Optional path to a YAML policy file. When absent, the shipped
    /// standard catalogue applies.
    #[serde(default)]
    pub policy_file: Option<String>,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// 1. Loads `.env` if present (for development).
    /// 2. Reads environment variables with the `METERING` prefix,
    ///    using `__` to separate nested values.
    ///
    /// # Environment Variable Format
    ///
    /// - `METERING__DATABASE__URL=...` -> `database.url = ...`
    /// - `METERING__POLICY_FILE=policies.yaml` -> `policy_file`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or
    /// values cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("METERING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.database.validate()?;
        Ok(())
    }
}
