//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Dispatch max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("Dispatch send timeout must be positive")]
    InvalidSendTimeout,

    #[error("Dispatch channel capacity must be positive")]
    InvalidChannelCapacity,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Store operation timeout must be positive")]
    InvalidStoreTimeout,
}
