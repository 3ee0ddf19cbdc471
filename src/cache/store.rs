//! Shared query cache for listings pages, backed by Moka

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::keys::{CacheKey, KeyPrefix};
use crate::clock::Clock;
use crate::models::AssetRecord;
use crate::source::{ListingsSource, SourceError};

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("{0}")]
    Source(Arc<SourceError>),

    #[error("{0} cannot be fetched from the listings source")]
    NotFetchable(CacheKey),

    #[error("{failed} of {total} refetches failed: {first}")]
    Refetch {
        failed: usize,
        total: usize,
        first: Box<CacheError>,
    },

    #[error("Fetch task for {0} did not complete: {1}")]
    Task(CacheKey, String),
}

impl CacheError {
    /// Upstream HTTP status behind this failure, if there was one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CacheError::Source(err) => match err.as_ref() {
                SourceError::Status { status, .. } => Some(*status),
                _ => None,
            },
            CacheError::Refetch { first, .. } => first.upstream_status(),
            CacheError::NotFetchable(_) | CacheError::Task(..) => None,
        }
    }
}

/// What is stored per fingerprint. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone)]
struct CacheEntry {
    records: Arc<Vec<AssetRecord>>,
    updated_at: i64,
    /// Sequence number taken when the fetch producing this entry started
    fetch_seq: u64,
}

/// A cached result as handed to readers
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub key: CacheKey,
    pub records: Arc<Vec<AssetRecord>>,
    pub updated_at: i64,
    pub stale: bool,
}

#[derive(Debug, Default)]
struct KeyMeta {
    subscribers: usize,
    lease_until: i64,
    invalidated_seq: u64,
}

impl KeyMeta {
    fn is_active(&self, now: i64) -> bool {
        self.subscribers > 0 || self.lease_until > now
    }
}

type FetchFuture = Shared<BoxFuture<'static, Result<CachedPage, CacheError>>>;

struct Inner {
    entries: Cache<CacheKey, CacheEntry>,
    meta: Mutex<HashMap<CacheKey, KeyMeta>>,
    in_flight: Mutex<HashMap<CacheKey, FetchFuture>>,
    source: Arc<dyn ListingsSource>,
    clock: Arc<dyn Clock>,
    active_lease_ms: i64,
    seq: AtomicU64,
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn meta(&self) -> MutexGuard<'_, HashMap<CacheKey, KeyMeta>> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, FetchFuture>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settings for [`QueryCache::new`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_capacity: u64,
    pub idle_ttl: Duration,
    pub active_lease: Duration,
}

/// Key-value store of listings query results, shared by every reader and
/// the freshness coordinator.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(
        settings: CacheSettings,
        source: Arc<dyn ListingsSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let entries = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_idle(settings.idle_ttl)
            .build();

        Self {
            inner: Arc::new(Inner {
                entries,
                meta: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                source,
                clock,
                active_lease_ms: i64::try_from(settings.active_lease.as_millis())
                    .unwrap_or(i64::MAX),
                seq: AtomicU64::new(1),
            }),
        }
    }

    fn view(&self, key: CacheKey, entry: CacheEntry) -> CachedPage {
        let invalidated_seq = self
            .inner
            .meta()
            .get(&key)
            .map(|m| m.invalidated_seq)
            .unwrap_or(0);
        CachedPage {
            key,
            records: entry.records,
            updated_at: entry.updated_at,
            stale: invalidated_seq > entry.fetch_seq,
        }
    }

    /// Peek at a cached result without fetching
    pub async fn get(&self, key: &CacheKey) -> Option<CachedPage> {
        let entry = self.inner.entries.get(key).await?;
        Some(self.view(*key, entry))
    }

    /// Read through the cache. A stale hit is served as-is while a
    /// background refetch replaces it.
    pub async fn get_or_fetch(&self, key: CacheKey) -> Result<CachedPage, CacheError> {
        if let Some(page) = self.get(&key).await {
            if page.stale {
                debug!("Stale hit for key: {}, revalidating", key);
                self.spawn_refetch(key);
            } else {
                debug!("Cache hit for key: {}", key);
            }
            return Ok(page);
        }

        debug!("Cache miss for key: {}", key);
        self.fetch(key).await
    }

    /// Fill a page that is missing or stale without marking it active
    pub async fn prefetch(&self, key: CacheKey) -> Result<(), CacheError> {
        match self.get(&key).await {
            Some(page) if !page.stale => Ok(()),
            _ => self.fetch(key).await.map(|_| ()),
        }
    }

    /// Fetch `key` from the source, joining a request already in flight.
    /// The request runs on its own task, so it completes and lands in the
    /// cache even if every waiter goes away.
    pub async fn fetch(&self, key: CacheKey) -> Result<CachedPage, CacheError> {
        let pending = {
            let mut in_flight = self.inner.in_flight();
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!("Joining in-flight fetch for key: {}", key);
                    pending.clone()
                }
                None => {
                    let this = self.clone();
                    let task = tokio::spawn(async move {
                        let result = this.load(key).await;
                        this.inner.in_flight().remove(&key);
                        result
                    });
                    let pending = async move {
                        task.await
                            .unwrap_or_else(|e| Err(CacheError::Task(key, e.to_string())))
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    async fn load(&self, key: CacheKey) -> Result<CachedPage, CacheError> {
        match key {
            CacheKey::Listings { limit, start } => {
                let fetch_seq = self.inner.next_seq();
                match self.inner.source.fetch_listings(limit, start).await {
                    Ok(records) => {
                        let entry = CacheEntry {
                            records: Arc::new(records),
                            updated_at: self.inner.clock.now_ms(),
                            fetch_seq,
                        };
                        self.inner.entries.insert(key, entry.clone()).await;
                        self.seed(&entry).await;
                        info!("Cached {} records for key: {}", entry.records.len(), key);
                        Ok(self.view(key, entry))
                    }
                    Err(e) => {
                        warn!("Fetch failed for key {}: {}", key, e);
                        Err(CacheError::Source(Arc::new(e)))
                    }
                }
            }
            CacheKey::ById(_) => Err(CacheError::NotFetchable(key)),
        }
    }

    /// Seed per-asset entries so detail lookups never hit the network
    async fn seed(&self, page: &CacheEntry) {
        for record in page.records.iter() {
            let entry = CacheEntry {
                records: Arc::new(vec![record.clone()]),
                updated_at: page.updated_at,
                fetch_seq: page.fetch_seq,
            };
            self.inner.entries.insert(CacheKey::by_id(record.id), entry).await;
        }
    }

    fn spawn_refetch(&self, key: CacheKey) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.fetch(key).await {
                warn!("Background refetch failed for key {}: {}", key, e);
            }
        });
    }

    /// Look an asset up in cached listings pages, newest page first, then
    /// in its seeded entry.
    pub async fn find_by_id(&self, id: i64) -> Option<AssetRecord> {
        let from_pages = self
            .inner
            .entries
            .iter()
            .filter(|(key, _)| key.is_listings())
            .filter_map(|(_, entry)| {
                entry
                    .records
                    .iter()
                    .find(|r| r.id == id)
                    .map(|r| (entry.updated_at, r.clone()))
            })
            .max_by_key(|(updated_at, _)| *updated_at)
            .map(|(_, record)| record);

        if from_pages.is_some() {
            return from_pages;
        }

        self.inner
            .entries
            .get(&CacheKey::by_id(id))
            .await
            .and_then(|entry| entry.records.first().cloned())
    }

    /// Register an observer; the key stays active until the guard drops
    pub fn subscribe(&self, key: CacheKey) -> Subscription {
        self.inner.meta().entry(key).or_default().subscribers += 1;
        debug!("Subscribed to key: {}", key);
        Subscription {
            cache: self.clone(),
            key,
        }
    }

    fn unsubscribe(&self, key: &CacheKey) {
        let now = self.inner.clock.now_ms();
        let mut meta = self.inner.meta();
        let released = match meta.get_mut(key) {
            Some(entry) => {
                entry.subscribers = entry.subscribers.saturating_sub(1);
                !entry.is_active(now) && !self.inner.entries.contains_key(key)
            }
            None => false,
        };
        if released {
            meta.remove(key);
        }
        debug!("Unsubscribed from key: {}", key);
    }

    /// Keep `key` active for one lease period without holding a subscription
    pub fn touch(&self, key: CacheKey) {
        let now = self.inner.clock.now_ms();
        let lease_until = now.saturating_add(self.inner.active_lease_ms);
        let mut meta = self.inner.meta();
        self.prune(&mut meta, now);
        let entry = meta.entry(key).or_default();
        entry.lease_until = entry.lease_until.max(lease_until);
    }

    /// Drop tracking for keys that are inactive and no longer cached
    fn prune(&self, meta: &mut HashMap<CacheKey, KeyMeta>, now: i64) {
        let before = meta.len();
        meta.retain(|key, m| m.is_active(now) || self.inner.entries.contains_key(key));
        if meta.len() < before {
            debug!("Pruned {} inactive keys", before - meta.len());
        }
    }

    /// Number of keys with activity or invalidation state
    pub fn tracked_keys(&self) -> usize {
        self.inner.meta().len()
    }

    pub fn is_active(&self, key: &CacheKey) -> bool {
        let now = self.inner.clock.now_ms();
        self.inner
            .meta()
            .get(key)
            .map(|m| m.is_active(now))
            .unwrap_or(false)
    }

    /// Whether a fetch for any key under `prefix` is in flight
    pub fn is_fetching(&self, prefix: &KeyPrefix) -> bool {
        self.inner.in_flight().keys().any(|key| prefix.matches(key))
    }

    /// Active entries under `prefix` with their last-updated timestamps
    pub fn query_active_by_prefix(&self, prefix: &KeyPrefix) -> Vec<(CacheKey, i64)> {
        let now = self.inner.clock.now_ms();
        let meta = self.inner.meta();
        self.inner
            .entries
            .iter()
            .filter(|(key, _)| prefix.matches(key))
            .filter(|(key, _)| meta.get(&**key).map(|m| m.is_active(now)).unwrap_or(false))
            .map(|(key, entry)| (*key, entry.updated_at))
            .collect()
    }

    fn active_keys(&self, prefix: &KeyPrefix) -> Vec<CacheKey> {
        let now = self.inner.clock.now_ms();
        self.inner
            .meta()
            .iter()
            .filter(|(key, meta)| key.is_listings() && prefix.matches(key) && meta.is_active(now))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Mark every entry under `prefix` stale and start background refetches
    /// for the active ones. Returns the number of entries marked.
    pub fn invalidate_by_prefix(&self, prefix: &KeyPrefix) -> usize {
        let seq = self.inner.next_seq();
        let mut marked = 0;
        {
            let mut meta = self.inner.meta();
            for (key, _) in self.inner.entries.iter() {
                if prefix.matches(&key) {
                    meta.entry(*key).or_default().invalidated_seq = seq;
                    marked += 1;
                }
            }
        }

        let active = self.active_keys(prefix);
        info!(
            "Invalidated {} entries under {}, refetching {} active",
            marked,
            prefix,
            active.len()
        );
        for key in active {
            self.spawn_refetch(key);
        }
        marked
    }

    /// Refetch every active key under `prefix` and wait for all of them.
    /// Returns the number refetched.
    pub async fn refetch_active_by_prefix(&self, prefix: &KeyPrefix) -> Result<usize, CacheError> {
        let keys = self.active_keys(prefix);
        let total = keys.len();
        let results = join_all(keys.into_iter().map(|key| self.fetch(key))).await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => {
                debug!("Refetched {} active keys under {}", total, prefix);
                Ok(total)
            }
            Some(first) => {
                let failed = 1 + failures.count();
                Err(CacheError::Refetch {
                    failed,
                    total,
                    first: Box::new(first),
                })
            }
        }
    }
}

/// Observer guard returned by [`QueryCache::subscribe`]
pub struct Subscription {
    cache: QueryCache,
    key: CacheKey,
}

impl Subscription {
    pub fn key(&self) -> CacheKey {
        self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}
