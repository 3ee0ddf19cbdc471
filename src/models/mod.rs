// Asset records as returned by the listings provider, plus the
// request/response shapes served to the dashboard.

use serde::{Deserialize, Serialize};

pub mod format;

/// USD quote block attached to an asset. Every metric is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsdQuote {
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub volume_change_24h: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub percent_change_30d: Option<f64>,
    pub percent_change_60d: Option<f64>,
    pub percent_change_90d: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_dominance: Option<f64>,
    pub fully_diluted_market_cap: Option<f64>,
    pub tvl: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "USD")]
    pub usd: Option<UsdQuote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub quote: Option<Quote>,
}

impl AssetRecord {
    pub fn usd(&self) -> Option<&UsdQuote> {
        self.quote.as_ref().and_then(|q| q.usd.as_ref())
    }

    pub fn price(&self) -> Option<f64> {
        self.usd().and_then(|usd| usd.price)
    }
}

/// Upstream listings body: `{ "data": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub data: Vec<AssetRecord>,
}

// API response models
#[derive(Debug, Serialize)]
pub struct ListingsPage {
    pub data: Vec<AssetRecord>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub limit: u32,
    pub start: u32,
    pub page: u32,
    /// Epoch milliseconds of the fetch that produced this page
    pub updated_at: i64,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyRequest {
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub symbol: String,
}
