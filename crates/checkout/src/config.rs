//! Checkout core configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COPPERPOT_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `COPPERPOT_DB_MAX_CONNECTIONS` - Pool upper bound (default: 10)
//! - `COPPERPOT_DB_MIN_CONNECTIONS` - Pool lower bound (default: 2)
//! - `COPPERPOT_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `COPPERPOT_TX_RETRY_LIMIT` - Serialization-failure retry budget (default: 3)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout core configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Minimum pool connections
    pub min_connections: u32,
    /// Pool acquire timeout in seconds
    pub acquire_timeout_secs: u64,
    /// How many times a serialization-failed transaction is retried
    pub tx_retry_limit: u32,
}

impl CheckoutConfig {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or an
    /// optional one fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = require_var("COPPERPOT_DATABASE_URL")?;

        Ok(Self {
            database_url: SecretString::from(database_url),
            max_connections: parse_var("COPPERPOT_DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_var("COPPERPOT_DB_MIN_CONNECTIONS", 2)?,
            acquire_timeout_secs: parse_var("COPPERPOT_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
            tx_retry_limit: parse_var("COPPERPOT_TX_RETRY_LIMIT", 3)?,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(name.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default() {
        // Variable not set: default wins.
        let value: u32 = parse_var("COPPERPOT_TEST_UNSET_VAR", 7).expect("default");
        assert_eq!(value, 7);
    }

    #[test]
    fn test_missing_required_var() {
        let err = require_var("COPPERPOT_TEST_DEFINITELY_MISSING").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name.contains("MISSING")));
    }
}
