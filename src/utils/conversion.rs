//! Type conversion and formatting utilities.
//!
//! Decimal normalization goes through BigDecimal so values above 2^53 keep
//! their precision until the final f64 cast.

use alloy::primitives::{hex, U256};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Convert U256 to f64 with decimal adjustment, or 0.0 if it does not fit.
pub fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    u256_to_f64_safe(value, decimals).unwrap_or(0.0)
}

/// Convert U256 to f64 with decimal adjustment.
///
/// Returns `None` if the adjusted value is not a finite f64.
fn u256_to_f64_safe(value: U256, decimals: u8) -> Option<f64> {
    let bytes: [u8; 32] = value.to_le_bytes();
    let big_int = BigInt::from_bytes_le(num_bigint::Sign::Plus, &bytes);
    let adjusted = BigDecimal::from(big_int) / big_pow10(decimals);

    let result = adjusted.to_f64()?;
    if result.is_finite() {
        Some(result)
    } else {
        None
    }
}

/// Convert a raw u128 reserve to f64 with decimal adjustment.
pub fn reserve_to_f64(reserve: u128, decimals: u8) -> f64 {
    let big_value = BigDecimal::from(reserve);

    let adjusted = if decimals == 0 { big_value } else { big_value / big_pow10(decimals) };

    adjusted.to_f64().unwrap_or(0.0)
}

static POW10_CACHE: Lazy<[BigDecimal; 28]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_to_f64_applies_decimals() {
        let value = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(u256_to_f64(value, 18), 1.5);
        assert!((u256_to_f64(U256::from(123_456_789u64), 6) - 123.456789).abs() < 1e-9);
    }

    #[test]
    fn test_ray_rate() {
        // 3.5% expressed in ray (1e27)
        let rate = U256::from(35u64) * U256::from(10u64).pow(U256::from(24u64));
        let parsed = u256_to_f64(rate, 27);
        assert!((parsed - 0.035).abs() < 1e-12);
    }

    #[test]
    fn test_reserve_to_f64() {
        assert_eq!(reserve_to_f64(2_000_000, 6), 2.0);
        assert_eq!(reserve_to_f64(42, 0), 42.0);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0xde, 0xad]), "0xdead");
    }
}
