//! Version-aware result cache shared by match scoring and résumé analysis.
//!
//! An entry is served only while both hold:
//! - its stored `ContentVersion` equals the caller's current version
//! - its age is below the TTL
//!
//! Anything else is a miss. Backend failures are logged and also read as a
//! miss (or a dropped write): the cache can slow the pipeline down, never
//! break it.

pub mod backend;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::candidate::ContentVersion;

pub use backend::{CacheBackend, CacheError, InMemoryBackend, RedisBackend};

/// Default lifetime for analysis results.
pub const DEFAULT_ANALYSIS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub version: ContentVersion,
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_valid_at(&self, current: ContentVersion, ttl: Duration, now: DateTime<Utc>) -> bool {
        if self.version != current {
            return false;
        }
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(self.stored_at) < ttl
    }
}

/// Typed cache over a `CacheBackend`. Create one per result kind at startup
/// and share it behind an `Arc`; `namespace` keeps kinds apart in a shared backend.
pub struct AnalysisCache<T> {
    backend: Arc<dyn CacheBackend>,
    namespace: &'static str,
    ttl: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> AnalysisCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: &'static str, ttl: Duration) -> Self {
        Self {
            backend,
            namespace,
            ttl,
            _value: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub async fn get(&self, key: &str, current: ContentVersion) -> Option<T> {
        let full_key = self.full_key(key);
        let payload = match self.backend.load(&full_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed on {} backend for {full_key}: {e}", self.backend.name());
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&payload) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable cache entry {full_key}: {e}");
                self.invalidate(key).await;
                return None;
            }
        };

        if entry.is_valid_at(current, self.ttl, Utc::now()) {
            debug!("Cache hit for {full_key}");
            Some(entry.value)
        } else {
            debug!("Cache entry {full_key} is stale (stored version {})", entry.version);
            None
        }
    }

    pub async fn set(&self, key: &str, value: &T, version: ContentVersion) {
        let full_key = self.full_key(key);
        let entry = CacheEntry {
            value,
            version,
            stored_at: Utc::now(),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cache entry {full_key} could not be encoded: {e}");
                return;
            }
        };
        if let Err(e) = self.backend.store(&full_key, payload, self.ttl).await {
            warn!("Cache write failed on {} backend for {full_key}: {e}", self.backend.name());
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let full_key = self.full_key(key);
        if let Err(e) = self.backend.remove(&full_key).await {
            warn!("Cache invalidation failed on {} backend for {full_key}: {e}", self.backend.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn cache(ttl: Duration) -> AnalysisCache<Vec<String>> {
        AnalysisCache::new(Arc::new(InMemoryBackend::new()), "test", ttl)
    }

    fn version_at(secs: i64) -> ContentVersion {
        ContentVersion::new(DateTime::from_timestamp(secs, 0).unwrap())
    }

    #[tokio::test]
    async fn test_hit_with_matching_version() {
        let cache = cache(DEFAULT_ANALYSIS_TTL);
        let value = vec!["Quantify impact".to_string()];
        cache.set("c1", &value, version_at(1_700_000_000)).await;

        assert_eq!(cache.get("c1", version_at(1_700_000_000)).await, Some(value));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_a_miss() {
        let cache = cache(DEFAULT_ANALYSIS_TTL);
        cache.set("c1", &vec!["x".to_string()], version_at(1_700_000_000)).await;

        assert_eq!(cache.get("c1", version_at(1_700_000_060)).await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_hits() {
        let cache = cache(Duration::ZERO);
        cache.set("c1", &vec!["x".to_string()], version_at(1)).await;

        assert_eq!(cache.get("c1", version_at(1)).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = cache(DEFAULT_ANALYSIS_TTL);
        cache.set("c1", &vec!["x".to_string()], version_at(1)).await;
        cache.invalidate("c1").await;

        assert_eq!(cache.get("c1", version_at(1)).await, None);
    }

    #[test]
    fn test_entry_validity_is_age_strictly_below_ttl() {
        let stored_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let entry = CacheEntry {
            value: (),
            version: version_at(5),
            stored_at,
        };
        let ttl = Duration::from_secs(3600);

        assert!(entry.is_valid_at(version_at(5), ttl, stored_at + chrono::Duration::seconds(3599)));
        assert!(!entry.is_valid_at(version_at(5), ttl, stored_at + chrono::Duration::seconds(3600)));
        assert!(!entry.is_valid_at(version_at(6), ttl, stored_at));
    }

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn load(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(serde_json::from_str::<()>("not json").unwrap_err().into())
        }

        async fn store(&self, _key: &str, _payload: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(serde_json::from_str::<()>("not json").unwrap_err().into())
        }

        async fn remove(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_backend_failures_read_as_miss() {
        let cache: AnalysisCache<u8> =
            AnalysisCache::new(Arc::new(BrokenBackend), "test", DEFAULT_ANALYSIS_TTL);
        cache.set("k", &42, version_at(1)).await;
        assert_eq!(cache.get("k", version_at(1)).await, None);
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryBackend::new());
        let scores: AnalysisCache<u8> = AnalysisCache::new(backend.clone(), "match", DEFAULT_ANALYSIS_TTL);
        let other: AnalysisCache<u8> = AnalysisCache::new(backend, "analysis", DEFAULT_ANALYSIS_TTL);

        scores.set("k", &70, version_at(1)).await;
        assert_eq!(other.get("k", version_at(1)).await, None);
        assert_eq!(scores.get("k", version_at(1)).await, Some(70));
    }
}
