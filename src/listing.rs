//! Search and ordering applied to one page of listings

use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::AssetRecord;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    Symbol,
    /// Highest price first
    Price,
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "name" => Ok(SortKey::Name),
            "symbol" => Ok(SortKey::Symbol),
            "price" => Ok(SortKey::Price),
            other => Err(ValidationError::InvalidParameter(format!(
                "sort must be one of name, symbol, price (got '{}')",
                other
            ))),
        }
    }
}

/// Case-insensitive subsequence match: "btc" matches "BiTCoin"
pub fn fuzzy_matches(query: &str, text: &str) -> bool {
    let mut haystack = text.chars().flat_map(char::to_lowercase);
    query
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .all(|needle| haystack.any(|c| c == needle))
}

fn lexical(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn compare(sort: SortKey, a: &AssetRecord, b: &AssetRecord) -> Ordering {
    match sort {
        SortKey::Name => lexical(&a.name, &b.name),
        SortKey::Symbol => lexical(&a.symbol, &b.symbol),
        SortKey::Price => {
            let pa = a.price().unwrap_or(0.0);
            let pb = b.price().unwrap_or(0.0);
            pb.total_cmp(&pa)
        }
    }
}

/// Records whose name or symbol fuzzily match `query`, in `sort` order.
/// An empty query keeps every record.
pub fn filter_and_sort(records: &[AssetRecord], query: &str, sort: SortKey) -> Vec<AssetRecord> {
    let query = query.trim();
    let mut selected: Vec<AssetRecord> = records
        .iter()
        .filter(|r| query.is_empty() || fuzzy_matches(query, &r.name) || fuzzy_matches(query, &r.symbol))
        .cloned()
        .collect();
    selected.sort_by(|a, b| compare(sort, a, b));
    selected
}
