//! Database configuration (PostgreSQL record store)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

fn default_max_connections() -> u32 {
    10
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

/// Settings for the durable record store
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Connection pool upper bound
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Bound for a single load/save round trip
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Validate database settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections > 100 {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.op_timeout_ms == 0 {
            return Err(ValidationError::InvalidStoreTimeout);
        }
        Ok(())
    }

    /// Bound for a single store operation
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://tender_desk@localhost/tender_desk".to_string(),
            max_connections: default_max_connections(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }

    #[test]
    fn valid_config_passes() {
        valid().validate().unwrap();
    }

    #[test]
    fn non_postgres_url_fails() {
        let config = DatabaseConfig {
            url: "mysql://nope".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_pool_fails() {
        let config = DatabaseConfig {
            max_connections: 101,
            ..valid()
        };
        assert!(config.validate().is_err());
    }
}
