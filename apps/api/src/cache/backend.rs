//! Storage behind `AnalysisCache`. Backends move opaque JSON payloads;
//! version and age checks happen in the cache itself.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// `ttl` is a storage hint for eviction; readers still check age themselves.
    async fn store(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process backend (default)
// ────────────────────────────────────────────────────────────────────────────

const DEFAULT_MAX_ENTRIES: usize = 50_000;
/// Longer TTLs are clamped so the expiry instant cannot overflow.
const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Process-local map. Not shared across instances: a multi-instance
/// deployment must configure `REDIS_URL` to get one cache.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, (String, Instant)>>,
    max_entries: usize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(payload, _)| payload.clone()))
    }

    async fn store(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            entries.retain(|_, (_, expires_at)| *expires_at > now);
            if entries.len() >= self.max_entries {
                // Still full of live entries: drop the one closest to expiry.
                if let Some(victim) = entries
                    .iter()
                    .min_by_key(|(_, (_, expires_at))| *expires_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&victim);
                }
            }
        }
        entries.insert(key.to_string(), (payload, now + ttl.min(MAX_ENTRY_TTL)));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend (shared across instances)
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisBackend {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisBackend {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                let conn = self.client.get_multiplexed_async_connection().await?;
                info!("Redis cache connection established");
                Ok::<_, CacheError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(payload)
    }

    async fn store(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
