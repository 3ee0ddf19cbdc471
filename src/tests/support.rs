//! Shared fixtures: a scripted listings source and an in-memory cache store

use crate::{
    cache::{CacheError, CacheKey, CacheSettings, CacheStore, KeyPrefix, QueryCache},
    clock::ManualClock,
    models::{AssetRecord, Quote, UsdQuote},
    source::{ListingsSource, SourceError},
};
use async_trait::async_trait;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::Semaphore;

pub const T0: i64 = 1_700_000_000_000;

pub fn asset(id: i64, name: &str, symbol: &str, price: Option<f64>) -> AssetRecord {
    AssetRecord {
        id,
        name: name.to_string(),
        symbol: symbol.to_string(),
        quote: price.map(|price| Quote {
            usd: Some(UsdQuote {
                price: Some(price),
                ..UsdQuote::default()
            }),
        }),
    }
}

/// `limit` records ranked from `start`, ids equal to rank
pub fn sample_page(limit: u32, start: u32) -> Vec<AssetRecord> {
    (start..start + limit)
        .map(|rank| {
            let id = rank as i64;
            asset(id, &format!("Coin {}", id), &format!("C{}", id), Some(id as f64 * 10.0))
        })
        .collect()
}

/// Wait (bounded) until `cond` holds, yielding to spawned tasks in between
pub async fn eventually<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Listings source that serves `sample_page`, optionally failing or
/// waiting for a permit before answering
#[derive(Default)]
pub struct StubSource {
    calls: AtomicUsize,
    fail: AtomicBool,
    gate: Option<Arc<Semaphore>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch blocks until a permit is added to the returned semaphore
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let source = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (source, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ListingsSource for StubSource {
    async fn fetch_listings(&self, limit: u32, start: u32) -> Result<Vec<AssetRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Status {
                status: 500,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(sample_page(limit, start))
    }
}

pub fn test_cache(source: Arc<StubSource>, clock: Arc<ManualClock>) -> QueryCache {
    QueryCache::new(
        CacheSettings {
            max_capacity: 100,
            idle_ttl: Duration::from_secs(3600),
            active_lease: Duration::from_secs(60),
        },
        source,
        clock,
    )
}

/// Cache store double that records what the coordinator asks of it
#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<Vec<(CacheKey, i64)>>,
    invalidations: AtomicUsize,
    refetches: AtomicUsize,
    fail: AtomicBool,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let store = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (store, gate)
    }

    pub fn set_entries(&self, entries: &[(CacheKey, i64)]) {
        *self.entries.lock().unwrap() = entries.to_vec();
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn refetches(&self) -> usize {
        self.refetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    fn query_active_by_prefix(&self, prefix: &KeyPrefix) -> Vec<(CacheKey, i64)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| prefix.matches(key))
            .copied()
            .collect()
    }

    fn invalidate_by_prefix(&self, _prefix: &KeyPrefix) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn refetch_active_by_prefix(&self, _prefix: &KeyPrefix) -> Result<(), CacheError> {
        self.refetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Source(Arc::new(SourceError::Status {
                status: 503,
                body: "try later".to_string(),
            })));
        }
        Ok(())
    }
}
