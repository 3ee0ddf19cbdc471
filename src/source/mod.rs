pub mod client;

use async_trait::async_trait;

use crate::models::AssetRecord;

// Re-exports for convenience
pub use client::{CoinMarketCapClient, SourceError};

/// Anything that can produce one page of listings
#[async_trait]
pub trait ListingsSource: Send + Sync + 'static {
    /// `limit` > 0, `start` >= 1 (1-based rank of the first asset)
    async fn fetch_listings(&self, limit: u32, start: u32) -> Result<Vec<AssetRecord>, SourceError>;
}
