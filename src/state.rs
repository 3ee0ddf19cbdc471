use crate::cache::QueryCache;
use crate::config::Config;
use crate::freshness::FreshnessCoordinator;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub cache: QueryCache,
    pub coordinator: Arc<FreshnessCoordinator>,
}
