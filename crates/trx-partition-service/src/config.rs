//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use trx_partition_store::{InsertStrategy, PgConfig};

/// Upper bound on `PRECREATE_DAYS`; larger values are clamped with a warning.
pub const MAX_PRECREATE_DAYS: u32 = 366;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection settings.
    pub database: PgConfig,

    /// Strategy used by `POST /v1/partition` when the request names none.
    pub default_strategy: InsertStrategy,

    /// Child partitions created at startup for today and this many following days.
    pub precreate_days: u32,

    /// Maximum number of transactions a single batch request may generate.
    pub max_batch_size: usize,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Database secrets file structure.
#[derive(Debug, Deserialize)]
struct DatabaseSecrets {
    url: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database = PgConfig {
            url: load_database_url().unwrap_or(defaults.database.url),
            max_connections: env_parse("DB_MAX_CONNECTIONS")
                .unwrap_or(defaults.database.max_connections),
            acquire_timeout_ms: env_parse("DB_ACQUIRE_TIMEOUT_MS")
                .unwrap_or(defaults.database.acquire_timeout_ms),
        };

        let default_strategy = match std::env::var("DEFAULT_INSERT_STRATEGY") {
            Ok(name) => name.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring DEFAULT_INSERT_STRATEGY");
                defaults.default_strategy
            }),
            Err(_) => defaults.default_strategy,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database,
            default_strategy,
            precreate_days: clamp_precreate_days(
                env_parse("PRECREATE_DAYS").unwrap_or(defaults.precreate_days),
            ),
            max_batch_size: env_parse("MAX_BATCH_SIZE").unwrap_or(defaults.max_batch_size),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

/// Bound the startup pre-creation window to [`MAX_PRECREATE_DAYS`].
fn clamp_precreate_days(days: u32) -> u32 {
    if days > MAX_PRECREATE_DAYS {
        tracing::warn!(
            requested = days,
            max = MAX_PRECREATE_DAYS,
            "Clamping PRECREATE_DAYS"
        );
        return MAX_PRECREATE_DAYS;
    }
    days
}

/// Parse an environment variable, treating unset or malformed values as absent.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load the database URL from a secrets file or the environment.
fn load_database_url() -> Option<String> {
    let secret_paths = [".secrets/postgres.json", "../.secrets/postgres.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<DatabaseSecrets>(path) {
            tracing::info!(path = %path, "Loaded database secrets from file");
            return Some(secrets.url);
        }
    }

    tracing::debug!("Database secrets file not found, using environment variables");
    std::env::var("DATABASE_URL").ok()
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database: PgConfig::default(),
            default_strategy: InsertStrategy::PartitionedDynamicCached,
            precreate_days: 1,
            max_batch_size: 10_000,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_cached_strategy() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.default_strategy,
            InsertStrategy::PartitionedDynamicCached
        );
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.max_batch_size > 0);
    }

    #[test]
    fn precreate_days_is_clamped() {
        assert_eq!(clamp_precreate_days(0), 0);
        assert_eq!(clamp_precreate_days(7), 7);
        assert_eq!(clamp_precreate_days(MAX_PRECREATE_DAYS), MAX_PRECREATE_DAYS);
        assert_eq!(clamp_precreate_days(u32::MAX), MAX_PRECREATE_DAYS);
    }

    #[test]
    fn missing_secrets_file_is_not_found() {
        let err = load_secrets_file::<DatabaseSecrets>("does/not/exist.json").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
