// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;

/// Number of questions drawn from the bank for each exam attempt.
pub const EXAM_QUESTION_COUNT: usize = 10;

/// Unsubmitted exam sessions older than this are discarded.
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Lowest scores (percent) for each grade band, best first.
pub const GRADE_EXCELLENT: f64 = 90.0;
pub const GRADE_GREAT_JOB: f64 = 70.0;
pub const GRADE_GOOD_EFFORT: f64 = 50.0;

pub const DEFAULT_LOCAL_BUFFER_URL: &str = "sqlite://exam_buffer.db";

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Remote PostgreSQL store. `None` runs the service in local-only mode.
    pub database_url: Option<String>,
    /// SQLite URL of the on-device buffer. `None` disables durable staging.
    pub local_buffer_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub probe_interval: Duration,
    pub bind_addr: SocketAddr,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL");

        let local_buffer_url = match get("LOCAL_BUFFER_URL") {
            Some(url) if url.eq_ignore_ascii_case("none") => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_LOCAL_BUFFER_URL.to_string()),
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match get("JWT_EXPIRATION") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: raw,
            })?,
            None => 3600,
        };

        let probe_interval = match get("CONNECTIVITY_PROBE_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CONNECTIVITY_PROBE_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(15),
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let rust_log = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_url,
            local_buffer_url,
            jwt_secret,
            jwt_expiration,
            admin_username: get("ADMIN_USERNAME"),
            admin_password: get("ADMIN_PASSWORD"),
            probe_interval,
            bind_addr,
            rust_log,
        })
    }
}
