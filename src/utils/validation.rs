//! Price sanity bounds.
//!
//! A reserve ratio beyond 1e12 or a token above $1M is treated as a decimals
//! or inversion error rather than a market price.

/// Maximum reasonable price ratio between two tokens.
pub const MAX_PRICE_RATIO: f64 = 1e12;

/// Minimum reasonable price ratio. Inverse of MAX_PRICE_RATIO.
pub const MIN_PRICE_RATIO: f64 = 1e-12;

/// Maximum reasonable token price in USD.
pub const MAX_TOKEN_USD_PRICE: f64 = 1e6;

/// Validate a price ratio is within reasonable bounds.
#[inline]
pub fn validate_price_ratio(price: f64) -> Option<f64> {
    if price.is_finite() && (MIN_PRICE_RATIO..=MAX_PRICE_RATIO).contains(&price) {
        Some(price)
    } else {
        None
    }
}

/// Validate a USD price is positive, finite and below the sanity ceiling.
#[inline]
pub fn validate_usd_price(price: f64) -> Option<f64> {
    if price > 0.0 && price.is_finite() && price <= MAX_TOKEN_USD_PRICE {
        Some(price)
    } else {
        None
    }
}
