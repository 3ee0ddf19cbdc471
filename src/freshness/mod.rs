//! Refresh countdown and revalidation of cached listings

pub mod coordinator;
pub mod state;

// Re-exports for convenience
pub use coordinator::{CoordinatorHandle, FreshnessCoordinator, RefreshOutcome, TickReport};
pub use state::{Countdown, Evaluation, FreshnessState, Phase};
