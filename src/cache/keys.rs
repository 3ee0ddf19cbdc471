//! Query fingerprints and prefix matching

use std::fmt;

/// Root namespace every cached query lives under
pub const ROOT: &str = "crypto";
pub const LISTINGS: &str = "listings";
pub const BY_ID: &str = "by_id";

/// Fingerprint of one cached query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// One page of listings
    Listings { limit: u32, start: u32 },
    /// A single asset seeded from a listings page
    ById(i64),
}

impl CacheKey {
    pub fn listings(limit: u32, start: u32) -> Self {
        Self::Listings { limit, start }
    }

    pub fn by_id(id: i64) -> Self {
        Self::ById(id)
    }

    /// Ordered segments, outermost first
    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::Listings { limit, start } => vec![
                ROOT.to_string(),
                LISTINGS.to_string(),
                format!("limit={}", limit),
                format!("start={}", start),
            ],
            Self::ById(id) => vec![ROOT.to_string(), BY_ID.to_string(), id.to_string()],
        }
    }

    pub fn is_listings(&self) -> bool {
        matches!(self, Self::Listings { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join(":"))
    }
}

/// Leading segments of a fingerprint; matches every key that starts with them
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix(Vec<String>);

impl KeyPrefix {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn all() -> Self {
        Self::new([ROOT])
    }

    pub fn listings() -> Self {
        Self::new([ROOT, LISTINGS])
    }

    pub fn by_id() -> Self {
        Self::new([ROOT, BY_ID])
    }

    pub fn exact(key: &CacheKey) -> Self {
        Self(key.segments())
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        let segments = key.segments();
        segments.len() >= self.0.len() && segments.iter().zip(&self.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}
