pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod freshness;
pub mod listing;
pub mod models;
pub mod source;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::{create_router, ListingsQuery};
pub use cache::{CacheKey, CacheStore, KeyPrefix, QueryCache};
pub use freshness::{CoordinatorHandle, FreshnessCoordinator};
pub use models::AssetRecord;
pub use source::{CoinMarketCapClient, ListingsSource};
pub use validation::{validate_buy, validate_limit, validate_start};
