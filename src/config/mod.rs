//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `TENDER_DESK`
//! prefix; nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tender_desk::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! let policy = config.dispatch.retry_policy();
//! ```

mod database;
mod dispatch;
mod error;

pub use database::DatabaseConfig;
pub use dispatch::DispatchConfig;
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Outbound notification delivery settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Durable record store settings; absent when running purely
    /// in-memory (tests, embedded)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads environment variables with the `TENDER_DESK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `TENDER_DESK__DISPATCH__MAX_ATTEMPTS=5` -> `dispatch.max_attempts = 5`
    /// - `TENDER_DESK__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into the
    /// expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENDER_DESK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.dispatch.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        Ok(())
    }
}
