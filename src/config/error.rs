//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ConfigValidationError),

    #[error("Policy file could not be read: {0}")]
    PolicyFileUnreadable(#[from] std::io::Error),

    #[error("Policy file could not be parsed: {0}")]
    PolicyFileInvalid(#[from] serde_yaml::Error),

    #[error("Policy file declares an invalid feature key: {0}")]
    PolicyFeatureInvalid(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 100")]
    InvalidPoolSize,
}
