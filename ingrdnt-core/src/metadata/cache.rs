//! In-memory memoization of ingredient metadata.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::fetcher::MetadataFetcher;
use crate::config::ScanConfig;
use crate::types::IngredientMetadata;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that went to the fetcher.
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Bounded, optionally expiring map from ingredient token to metadata.
///
/// Cloning is cheap and clones share storage, so one cache can be handed to
/// every analyzer in the process. Entries are not persisted.
#[derive(Clone)]
pub struct MetadataCache {
    inner: Cache<String, IngredientMetadata>,
    counters: Arc<Counters>,
}

impl MetadataCache {
    pub fn new(capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            inner: builder.build(),
            counters: Arc::default(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.metadata_cache_capacity, config.metadata_cache_ttl)
    }

    pub async fn get(&self, token: &str) -> Option<IngredientMetadata> {
        self.inner.get(token).await
    }

    pub async fn put(&self, token: &str, metadata: IngredientMetadata) {
        self.inner.insert(token.to_string(), metadata).await;
    }

    /// Return cached metadata for `token`, fetching and caching it on a miss.
    ///
    /// Concurrent misses for the same token share a single fetch. Whatever
    /// the fetcher returns is cached, including empty metadata from a failed
    /// lookup, so failures are not retried until the entry expires or is
    /// evicted.
    pub async fn get_or_fetch(&self, token: &str, fetcher: &dyn MetadataFetcher) -> IngredientMetadata {
        if let Some(hit) = self.inner.get(token).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(token, "metadata cache hit");
            return hit;
        }

        let counters = Arc::clone(&self.counters);
        self.inner
            .get_with(token.to_string(), async move {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(token, "metadata cache miss, fetching");
                fetcher.fetch(token).await
            })
            .await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Approximate number of entries; pending evictions may not be applied yet.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.inner.contains_key(token)
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}
