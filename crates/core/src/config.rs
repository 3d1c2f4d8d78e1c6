//! Database configuration loaded from a `.env` file and the process environment.
//!
//! Process environment variables always win over values from the file, and a
//! missing file is not an error. The connection string is assembled from the
//! individual `DB_*` parts.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use validator::{Validate, ValidationError};

pub const DB_CONNECTION: &str = "DB_CONNECTION";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_QUERY_TIMEOUT_SECS: &str = "DB_QUERY_TIMEOUT_SECS";
pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
pub const DB_MIN_CONNECTIONS: &str = "DB_MIN_CONNECTIONS";
pub const DB_MAX_LIFETIME_SECS: &str = "DB_MAX_LIFETIME_SECS";
pub const DB_IDLE_TIMEOUT_SECS: &str = "DB_IDLE_TIMEOUT_SECS";

/// Default bound for every store-facing call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Drivers the connection provider can open.
const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid database configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Unsupported database driver: {0:?}")]
    UnsupportedDriver(String),

    #[error("{key} must be a non-negative integer within range, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Connection pool tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_pool_bounds", skip_on_field_errors = false))]
pub struct PoolSettings {
    #[validate(range(min = 1, message = "DB_MAX_CONNECTIONS must be at least 1"))]
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 5,
            max_lifetime: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Everything needed to open a pooled database handle.
///
/// | Env Var                  | Default |
/// |--------------------------|---------|
/// | `DB_CONNECTION`          | (none)  |
/// | `DB_USER`                | (none)  |
/// | `DB_PASSWORD`            | (none)  |
/// | `DB_HOST`                | (none)  |
/// | `DB_PORT`                | (none)  |
/// | `DB_NAME`                | (none)  |
/// | `DB_QUERY_TIMEOUT_SECS`  | `3`     |
/// | `DB_MAX_CONNECTIONS`     | `20`    |
/// | `DB_MIN_CONNECTIONS`     | `5`     |
/// | `DB_MAX_LIFETIME_SECS`   | `60`    |
/// | `DB_IDLE_TIMEOUT_SECS`   | `600`   |
#[derive(Debug, Clone, Validate)]
pub struct DbConfig {
    #[validate(length(min = 1, message = "DB_CONNECTION is required"))]
    pub driver_name: String,
    #[validate(length(min = 1, message = "connection string is required"))]
    pub dsn: String,
    pub query_timeout: Duration,
    #[validate(nested)]
    pub pool: PoolSettings,
}

impl DbConfig {
    /// Load and validate configuration from `env_file` overlaid by the
    /// process environment.
    pub fn load(env_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_env_file(env_file)?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Resolve configuration from `env_file` and the process environment
    /// without validating it.
    pub fn from_env_file(env_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_vars = read_env_file(env_file);
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// Missing keys resolve to empty strings so the DSN keeps its shape
    /// even when nothing is configured.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        let driver_name = get(DB_CONNECTION);
        let dsn = format!(
            "{}://{}:{}@{}:{}/{}?sslmode=disable",
            driver_name,
            get(DB_USER),
            get(DB_PASSWORD),
            get(DB_HOST),
            get(DB_PORT),
            get(DB_NAME),
        );

        let defaults = PoolSettings::default();
        let seconds = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_number(key, lookup(key))?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };

        let pool = PoolSettings {
            max_connections: parse_number(DB_MAX_CONNECTIONS, lookup(DB_MAX_CONNECTIONS))?
                .unwrap_or(defaults.max_connections),
            min_connections: parse_number(DB_MIN_CONNECTIONS, lookup(DB_MIN_CONNECTIONS))?
                .unwrap_or(defaults.min_connections),
            max_lifetime: seconds(DB_MAX_LIFETIME_SECS, defaults.max_lifetime)?,
            idle_timeout: seconds(DB_IDLE_TIMEOUT_SECS, defaults.idle_timeout)?,
        };

        Ok(Self {
            driver_name,
            dsn,
            query_timeout: seconds(DB_QUERY_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT)?,
            pool,
        })
    }

    /// Check required fields and that the driver is one we can open.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if !SUPPORTED_DRIVERS.contains(&self.driver_name.as_str()) {
            return Err(ConfigError::UnsupportedDriver(self.driver_name.clone()));
        }
        Ok(())
    }

    /// The connection string with the password masked, for logging.
    pub fn redacted_dsn(&self) -> String {
        let Some((scheme, rest)) = self.dsn.split_once("://") else {
            return self.dsn.clone();
        };
        let Some((credentials, location)) = rest.rsplit_once('@') else {
            return self.dsn.clone();
        };
        match credentials.split_once(':') {
            Some((user, password)) if !password.is_empty() => {
                format!("{scheme}://{user}:***@{location}")
            }
            _ => self.dsn.clone(),
        }
    }
}

/// Read `KEY=value` pairs from a dotenv file. Unreadable or missing files
/// yield an empty map; malformed lines are skipped.
pub fn read_env_file(path: impl AsRef<Path>) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path.as_ref()) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => HashMap::new(),
    }
}

/// Parse an optional numeric setting. Values outside `T`'s range are
/// rejected, never truncated.
fn parse_number<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                key,
                value: value.to_string(),
            }),
    }
}

fn validate_pool_bounds(pool: &PoolSettings) -> Result<(), ValidationError> {
    if pool.min_connections > pool.max_connections {
        return Err(ValidationError::new("pool_bounds").with_message(
            "DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS".into(),
        ));
    }
    Ok(())
}
