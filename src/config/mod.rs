//! Application configuration loaded from environment.

use std::net::SocketAddr;
use std::time::Duration;

/// Token lifetime when `TOKEN_TTL_SECS` is unset.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Upper bound for `TOKEN_TTL_SECS` and `TOKEN_LEEWAY_SECS` (ten years).
pub const MAX_TOKEN_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. `0.0.0.0:3000`).
    pub server_addr: SocketAddr,
    /// PostgreSQL connection URL. `None` runs with the in-memory store.
    pub database_url: Option<String>,
    /// HS256 signing secret for bearer tokens. Required.
    pub signing_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl: Duration,
    /// Clock-skew tolerance applied to the expiry check.
    pub token_leeway: Duration,
    /// Argon2 time cost (iterations).
    pub hash_cost_factor: u32,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let database_url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());

        let signing_secret = lookup("SIGNING_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigLoadError::MissingSigningSecret)?;

        let token_ttl = match lookup("TOKEN_TTL_SECS") {
            Some(v) => parse_duration_secs(&v, "TOKEN_TTL_SECS")?,
            None => DEFAULT_TOKEN_TTL,
        };

        let token_leeway = match lookup("TOKEN_LEEWAY_SECS") {
            Some(v) => parse_duration_secs(&v, "TOKEN_LEEWAY_SECS")?,
            None => Duration::ZERO,
        };

        let hash_cost_factor = match lookup("HASH_COST_FACTOR") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|c| *c >= 1)
                .ok_or(ConfigLoadError::InvalidNumber("HASH_COST_FACTOR"))?,
            None => argon2::Params::DEFAULT_T_COST,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            server_addr,
            database_url,
            signing_secret,
            token_ttl,
            token_leeway,
            hash_cost_factor,
            log_level,
        })
    }
}

fn parse_duration_secs(value: &str, key: &'static str) -> Result<Duration, ConfigLoadError> {
    value
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
        .filter(|d| *d <= MAX_TOKEN_DURATION)
        .ok_or(ConfigLoadError::InvalidNumber(key))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,
    #[error("SIGNING_SECRET must be set")]
    MissingSigningSecret,
    #[error("Invalid value for {0}")]
    InvalidNumber(&'static str),
}
