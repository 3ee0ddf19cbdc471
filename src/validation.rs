use crate::models::BuyRequest;
use thiserror::Error;

/// Upper bound on a simulated buy, in USD
pub const MAX_BUY_USD: f64 = 5000.0;
/// Largest page the listings provider will serve
pub const MAX_LIMIT: u32 = 5000;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Enter an amount between 0 and 5000 USD")]
    InvalidAmount,
}

fn parse_positive(name: &str, value: &str) -> Result<u32, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingParameter(name.to_string()));
    }
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::InvalidParameter(format!(
            "{} must be a positive integer",
            name
        ))),
    }
}

pub fn validate_limit(limit: &str) -> Result<u32, ValidationError> {
    let limit = parse_positive("limit", limit)?;
    if limit > MAX_LIMIT {
        return Err(ValidationError::InvalidParameter(format!(
            "limit must be at most {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// 1-based rank of the first listing on a page
pub fn validate_start(start: &str) -> Result<u32, ValidationError> {
    parse_positive("start", start)
}

pub fn validate_page(page: &str) -> Result<u32, ValidationError> {
    parse_positive("page", page)
}

/// `start` of a 1-based `page` of `limit` listings
pub fn start_for_page(page: u32, limit: u32) -> Result<u32, ValidationError> {
    (page - 1)
        .checked_mul(limit)
        .and_then(|offset| offset.checked_add(1))
        .ok_or_else(|| ValidationError::InvalidParameter("page is out of range".to_string()))
}

/// Check a buy and normalise it: symbol trimmed, amount rounded to cents
pub fn validate_buy(request: &BuyRequest) -> Result<BuyRequest, ValidationError> {
    let symbol = request.symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::MissingParameter("symbol".to_string()));
    }

    let amount = request.amount_usd;
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_BUY_USD {
        return Err(ValidationError::InvalidAmount);
    }

    Ok(BuyRequest {
        amount_usd: (amount * 100.0).round() / 100.0,
        symbol: symbol.to_string(),
    })
}
