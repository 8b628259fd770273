use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8084";

/// Default per-query storage timeout in milliseconds.
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 2500;

/// Default database connection pool size.
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Claim policy for participants within a room.
///
/// Controls whether a participant may hold claims on several options of the
/// same room at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimPolicy {
    /// At most one claim per participant per room. Claiming a new option
    /// releases the participant's previous claim in that room first.
    #[default]
    Exclusive,

    /// A participant may hold claims on any number of options.
    Unlimited,
}

impl ClaimPolicy {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "exclusive" => Ok(ClaimPolicy::Exclusive),
            "unlimited" => Ok(ClaimPolicy::Unlimited),
            other => Err(ConfigError::InvalidClaimPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Bound on every storage operation; exceeding it surfaces as
    /// `StorageUnavailable`, never as a definite claim outcome.
    pub storage_timeout: Duration,
    pub db_max_connections: u32,
    pub claim_policy: ClaimPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid claim policy: {0} (expected 'exclusive' or 'unlimited')")]
    InvalidClaimPolicy(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let storage_timeout_ms = match vars.get("STORAGE_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("STORAGE_TIMEOUT_MS", raw.clone()))?,
            None => DEFAULT_STORAGE_TIMEOUT_MS,
        };

        let db_max_connections = match vars.get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS", raw.clone()))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let claim_policy = match vars.get("CLAIM_POLICY") {
            Some(raw) => ClaimPolicy::parse(raw)?,
            None => ClaimPolicy::default(),
        };

        Ok(Config {
            database_url,
            bind_address,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            db_max_connections,
            claim_policy,
        })
    }
}
