use serde::Serialize;

/// Where the coordinator stands within the current freshness window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No active cache entry under the prefix
    NoData,
    /// Time left before the window closes
    Counting,
    /// Window closed; one invalidation issued, waiting for a newer timestamp
    AtZeroPendingInvalidation,
}

/// What the dashboard shows next to the refresh button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    /// Whole seconds until the next refresh; `None` until data exists
    pub seconds: Option<u64>,
    pub phase: Phase,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            seconds: None,
            phase: Phase::NoData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub latest_updated_at: i64,
    pub countdown: Countdown,
    /// Issue exactly one invalidation for `latest_updated_at`
    pub should_invalidate: bool,
}

/// Last observed timestamp plus the single-shot invalidation guard.
///
/// Invalidation fires at most once per distinct `latest_updated_at`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreshnessState {
    last_seen: Option<i64>,
    invalidated_for: Option<i64>,
}

impl FreshnessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }

    pub fn invalidated_for(&self) -> Option<i64> {
        self.invalidated_for
    }

    /// Fold one observation of the cache timestamps into the state.
    /// All times are epoch milliseconds.
    pub fn evaluate<I>(&mut self, updated_ats: I, interval_ms: i64, now_ms: i64) -> Evaluation
    where
        I: IntoIterator<Item = i64>,
    {
        let latest = updated_ats.into_iter().max().unwrap_or(0).max(0);

        if self.last_seen != Some(latest) {
            self.last_seen = Some(latest);
            self.invalidated_for = None;
        }

        if latest == 0 {
            return Evaluation {
                latest_updated_at: 0,
                countdown: Countdown::default(),
                should_invalidate: false,
            };
        }

        let remaining_ms = latest
            .saturating_add(interval_ms)
            .saturating_sub(now_ms)
            .max(0);
        let seconds = (remaining_ms as u64).div_ceil(1000);

        let should_invalidate = seconds == 0 && self.invalidated_for != Some(latest);
        if should_invalidate {
            self.invalidated_for = Some(latest);
        }

        let phase = if seconds > 0 {
            Phase::Counting
        } else {
            Phase::AtZeroPendingInvalidation
        };

        Evaluation {
            latest_updated_at: latest,
            countdown: Countdown {
                seconds: Some(seconds),
                phase,
            },
            should_invalidate,
        }
    }
}
