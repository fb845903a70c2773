use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cache::DEFAULT_ANALYSIS_TTL;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// When set, the match and analysis caches are shared through Redis.
    pub redis_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub oracle: OracleSettings,
    pub cache: CacheSettings,
    pub batch: BatchSettings,
}

/// Timeouts and retry budget for oracle calls, per call site.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub match_timeout: Duration,
    pub batch_timeout: Duration,
    pub analysis_timeout: Duration,
    pub max_retries: u32,
    /// Process-wide cap on oracle calls in flight.
    pub max_in_flight: usize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub match_ttl: Duration,
    pub analysis_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub fan_out: usize,
    pub chunk_size: usize,
    pub upsert_chunk_size: usize,
    pub failed_match_score: u8,
}

const MIN_ORACLE_TIMEOUT_SECS: u64 = 1;
const MAX_ORACLE_TIMEOUT_SECS: u64 = 120;
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let failed_match_score: u8 = optional_env("FAILED_MATCH_SCORE", 10)?;
        if failed_match_score > 100 {
            bail!("FAILED_MATCH_SCORE must be between 0 and 100");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: optional_env("DATABASE_MAX_CONNECTIONS", 16)?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            oracle: OracleSettings {
                match_timeout: timeout_env("ORACLE_MATCH_TIMEOUT_SECS", 30)?,
                batch_timeout: timeout_env("ORACLE_BATCH_TIMEOUT_SECS", 15)?,
                analysis_timeout: timeout_env("ORACLE_ANALYSIS_TIMEOUT_SECS", 45)?,
                max_retries: optional_env("ORACLE_MAX_RETRIES", 2)?,
                max_in_flight: positive(
                    optional_env("ORACLE_MAX_IN_FLIGHT", 16)?,
                    "ORACLE_MAX_IN_FLIGHT",
                )?,
            },
            cache: CacheSettings {
                match_ttl: cache_ttl_env("MATCH_CACHE_TTL_SECS", 3600)?,
                analysis_ttl: cache_ttl_env("ANALYSIS_CACHE_TTL_SECS", DEFAULT_ANALYSIS_TTL.as_secs())?,
            },
            batch: BatchSettings {
                fan_out: positive(optional_env("MATCH_FAN_OUT", 8)?, "MATCH_FAN_OUT")?,
                chunk_size: positive(optional_env("BATCH_CHUNK_SIZE", 5)?, "BATCH_CHUNK_SIZE")?,
                upsert_chunk_size: positive(
                    optional_env("UPSERT_CHUNK_SIZE", 10)?,
                    "UPSERT_CHUNK_SIZE",
                )?,
                failed_match_score,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or_default(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_or_default<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {value}")),
        None => Ok(default),
    }
}

fn timeout_env(key: &str, default_secs: u64) -> Result<Duration> {
    let secs: u64 = optional_env(key, default_secs)?;
    if !(MIN_ORACLE_TIMEOUT_SECS..=MAX_ORACLE_TIMEOUT_SECS).contains(&secs) {
        bail!(
            "{key} must be between {MIN_ORACLE_TIMEOUT_SECS} and {MAX_ORACLE_TIMEOUT_SECS} seconds, got {secs}"
        );
    }
    Ok(Duration::from_secs(secs))
}

fn cache_ttl_env(key: &str, default_secs: u64) -> Result<Duration> {
    let secs: u64 = optional_env(key, default_secs)?;
    check_cache_ttl(key, secs)
}

fn check_cache_ttl(key: &str, secs: u64) -> Result<Duration> {
    if !(1..=MAX_CACHE_TTL_SECS).contains(&secs) {
        bail!("{key} must be between 1 and {MAX_CACHE_TTL_SECS} seconds, got {secs}");
    }
    Ok(Duration::from_secs(secs))
}

fn positive(value: usize, key: &str) -> Result<usize> {
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
