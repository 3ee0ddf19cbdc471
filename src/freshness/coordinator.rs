use crate::cache::{CacheError, CacheStore, KeyPrefix};
use crate::clock::Clock;
use crate::freshness::state::{Countdown, FreshnessState};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The countdown is re-evaluated at 1 Hz
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub latest_updated_at: i64,
    pub countdown: Countdown,
    pub invalidated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed,
    /// Another manual refresh was already in flight
    Skipped,
}

/// Keeps the "next update in" countdown current and revalidates the cached
/// pages under `prefix` once per freshness window.
pub struct FreshnessCoordinator {
    store: Arc<dyn CacheStore>,
    prefix: KeyPrefix,
    interval: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<FreshnessState>,
    locked: AtomicBool,
    countdown: watch::Sender<Countdown>,
}

impl FreshnessCoordinator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        prefix: KeyPrefix,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (countdown, _) = watch::channel(Countdown::default());
        Self {
            store,
            prefix,
            interval,
            clock,
            state: Mutex::new(FreshnessState::new()),
            locked: AtomicBool::new(false),
            countdown,
        }
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest published countdown
    pub fn countdown(&self) -> Countdown {
        *self.countdown.borrow()
    }

    /// Follow countdown updates as they are published
    pub fn watch(&self) -> watch::Receiver<Countdown> {
        self.countdown.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// One evaluation of the freshness window
    pub fn tick(&self) -> TickReport {
        let updated_ats = self
            .store
            .query_active_by_prefix(&self.prefix)
            .into_iter()
            .map(|(_, updated_at)| updated_at);

        let evaluation = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.evaluate(
                updated_ats,
                i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX),
                self.clock.now_ms(),
            )
        };

        if evaluation.should_invalidate {
            info!(
                "Freshness window closed for {} (updated at {}), invalidating",
                self.prefix, evaluation.latest_updated_at
            );
            self.store.invalidate_by_prefix(&self.prefix);
        }

        self.countdown.send_replace(evaluation.countdown);
        debug!("Tick for {}: {:?}", self.prefix, evaluation.countdown);

        TickReport {
            latest_updated_at: evaluation.latest_updated_at,
            countdown: evaluation.countdown,
            invalidated: evaluation.should_invalidate,
        }
    }

    /// Refetch every active page now. A call made while another is in flight
    /// returns `Skipped` immediately; it is never queued.
    pub async fn manual_refresh(&self) -> Result<RefreshOutcome, CacheError> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Manual refresh already in flight for {}", self.prefix);
            return Ok(RefreshOutcome::Skipped);
        }
        let _unlock = Unlock(&self.locked);

        info!("Manual refresh for {}", self.prefix);
        self.store.refetch_active_by_prefix(&self.prefix).await?;
        Ok(RefreshOutcome::Refreshed)
    }

    /// Start the 1 Hz polling loop in the background
    pub fn start(self: &Arc<Self>) -> CoordinatorHandle {
        let shutdown = CancellationToken::new();
        let cancelled = shutdown.clone();
        let coordinator = Arc::clone(self);

        info!(
            "Starting freshness coordinator for {} with interval {:?}",
            coordinator.prefix, coordinator.interval
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        info!("Stopping freshness coordinator for {}", coordinator.prefix);
                        break;
                    }
                    _ = ticker.tick() => {
                        coordinator.tick();
                    }
                }
            }
        });

        CoordinatorHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Clears the manual-refresh lock however the refresh ends
struct Unlock<'a>(&'a AtomicBool);

impl Drop for Unlock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Running polling loop. Dropping the handle stops the loop.
pub struct CoordinatorHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Cancel the polling loop. Safe to call more than once.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop and wait for the loop to exit
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
