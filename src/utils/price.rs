//! USD pricing of AMM pair tokens from reserves.

use super::validation::{validate_price_ratio, validate_usd_price};

/// USD prices of both pair tokens. Zero means unpriced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairPrices {
    pub token0: f64,
    pub token1: f64,
}

/// Price both tokens of a pair in USD.
///
/// A stablecoin leg is worth $1.00 and the other leg is priced from the
/// reserve ratio. Pairs with no stablecoin leg, empty reserves, or a ratio
/// outside the sanity bounds stay unpriced.
///
/// # Arguments
/// * `reserve0`, `reserve1` - Decimal-adjusted reserves
/// * `token0_stable`, `token1_stable` - Whether each token is a configured stablecoin
pub fn pair_usd_prices(
    reserve0: f64,
    reserve1: f64,
    token0_stable: bool,
    token1_stable: bool,
) -> PairPrices {
    match (token0_stable, token1_stable) {
        (true, true) => PairPrices {
            token0: 1.0,
            token1: 1.0,
        },
        (true, false) => PairPrices {
            token0: 1.0,
            token1: implied_price(reserve0, reserve1).unwrap_or(0.0),
        },
        (false, true) => PairPrices {
            token0: implied_price(reserve1, reserve0).unwrap_or(0.0),
            token1: 1.0,
        },
        (false, false) => PairPrices::default(),
    }
}

/// Price of the base token in quote units: quote_reserve / base_reserve.
fn implied_price(quote_reserve: f64, base_reserve: f64) -> Option<f64> {
    if base_reserve <= 0.0 || quote_reserve <= 0.0 {
        return None;
    }
    validate_price_ratio(quote_reserve / base_reserve).and_then(validate_usd_price)
}
