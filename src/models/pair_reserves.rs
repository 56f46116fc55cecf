use serde::{Deserialize, Serialize};

use super::{BlockSeries, ChainHeightRange};

/// Reserves and USD prices of an AMM pair as of one block.
///
/// All amounts are already normalized by token decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PairBlockReserves {
    pub token0: f64,
    pub token1: f64,
    #[serde(rename = "token0USD")]
    pub token0_usd: f64,
    #[serde(rename = "token1USD")]
    pub token1_usd: f64,
    #[serde(rename = "token0Price")]
    pub token0_price: f64,
    #[serde(rename = "token1Price")]
    pub token1_price: f64,
}

/// Per-block reserves series of one pair over one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairTotalReservesSnapshot {
    pub contract: String,
    pub chain_height_range: ChainHeightRange,
    pub token0_reserves: BlockSeries<f64>,
    pub token1_reserves: BlockSeries<f64>,
    #[serde(rename = "token0ReservesUSD")]
    pub token0_reserves_usd: BlockSeries<f64>,
    #[serde(rename = "token1ReservesUSD")]
    pub token1_reserves_usd: BlockSeries<f64>,
    pub token0_prices: BlockSeries<f64>,
    pub token1_prices: BlockSeries<f64>,
}

impl PairTotalReservesSnapshot {
    pub fn new(contract: String, chain_height_range: ChainHeightRange) -> Self {
        Self {
            contract,
            chain_height_range,
            token0_reserves: BlockSeries::new(),
            token1_reserves: BlockSeries::new(),
            token0_reserves_usd: BlockSeries::new(),
            token1_reserves_usd: BlockSeries::new(),
            token0_prices: BlockSeries::new(),
            token1_prices: BlockSeries::new(),
        }
    }

    pub fn push_block(&mut self, block: u64, reserves: &PairBlockReserves) {
        self.token0_reserves.insert(block, reserves.token0);
        self.token1_reserves.insert(block, reserves.token1);
        self.token0_reserves_usd.insert(block, reserves.token0_usd);
        self.token1_reserves_usd.insert(block, reserves.token1_usd);
        self.token0_prices.insert(block, reserves.token0_price);
        self.token1_prices.insert(block, reserves.token1_price);
    }
}
