//! Utility functions for the snapshotter.
//!
//! - [`validation`] - Price sanity bounds
//! - [`conversion`] - Type conversions (U256, u128, hex encoding)
//! - [`price`] - USD pricing from pair reserves
//! - [`project_id`] - Project and content identifiers

mod conversion;
mod price;
mod project_id;
mod validation;

// ============================================
// Common Constants
// ============================================

/// Fixed-point base of Aave rates (1e27).
pub const RAY_DECIMALS: u8 = 27;

/// Decimals of the Aave oracle USD base currency.
pub const ORACLE_PRICE_DECIMALS: u8 = 8;

// ============================================
// Re-exports
// ============================================

pub use conversion::{hex_encode, reserve_to_f64, u256_to_f64};
pub use price::{pair_usd_prices, PairPrices};
pub use project_id::{aggregate_project_id, content_id, project_id, ProjectKind};
pub use validation::{validate_price_ratio, validate_usd_price, MAX_TOKEN_USD_PRICE};
