pub mod keys;
pub mod store;

use async_trait::async_trait;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::source::ListingsSource;

pub use keys::{CacheKey, KeyPrefix};
pub use store::{CacheError, CacheSettings, CachedPage, QueryCache, Subscription};

/// The slice of the cache the freshness coordinator works against
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Active entries under `prefix` with their last-updated timestamps (epoch ms)
    fn query_active_by_prefix(&self, prefix: &KeyPrefix) -> Vec<(CacheKey, i64)>;

    /// Mark matching entries stale. Must not block.
    fn invalidate_by_prefix(&self, prefix: &KeyPrefix);

    /// Resolves once every active matching entry has refetched or failed
    async fn refetch_active_by_prefix(&self, prefix: &KeyPrefix) -> Result<(), CacheError>;
}

#[async_trait]
impl CacheStore for QueryCache {
    fn query_active_by_prefix(&self, prefix: &KeyPrefix) -> Vec<(CacheKey, i64)> {
        QueryCache::query_active_by_prefix(self, prefix)
    }

    fn invalidate_by_prefix(&self, prefix: &KeyPrefix) {
        QueryCache::invalidate_by_prefix(self, prefix);
    }

    async fn refetch_active_by_prefix(&self, prefix: &KeyPrefix) -> Result<(), CacheError> {
        QueryCache::refetch_active_by_prefix(self, prefix).await.map(|_| ())
    }
}

pub fn init_cache(config: &Config, source: Arc<dyn ListingsSource>, clock: Arc<dyn Clock>) -> QueryCache {
    QueryCache::new(
        CacheSettings {
            max_capacity: config.cache_max_capacity,
            idle_ttl: config.cache_idle_ttl,
            active_lease: config.active_lease,
        },
        source,
        clock,
    )
}
