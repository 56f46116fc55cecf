use serde::{Deserialize, Serialize};

use super::{BlockSeries, ChainHeightRange};

/// Lending reserve totals of one asset as of one block.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBlockTotals {
    pub total_supply: f64,
    #[serde(rename = "supplyUSD")]
    pub supply_usd: f64,
    pub variable_debt: f64,
    #[serde(rename = "variableDebtUSD")]
    pub variable_debt_usd: f64,
    pub stable_debt: f64,
    #[serde(rename = "stableDebtUSD")]
    pub stable_debt_usd: f64,
    pub liquidity_rate: f64,
    pub variable_borrow_rate: f64,
    #[serde(rename = "priceUSD")]
    pub price_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetSupply {
    pub token_supply: f64,
    pub usd_supply: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetDebt {
    pub token_debt: f64,
    pub usd_debt: f64,
}

/// Per-block supply and debt series of one lending asset over one epoch.
///
/// This is the per-source input of the market stats aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTotalSnapshot {
    pub contract: String,
    pub chain_height_range: ChainHeightRange,
    #[serde(rename = "totalAToken")]
    pub total_a_token: BlockSeries<AssetSupply>,
    pub total_variable_debt: BlockSeries<AssetDebt>,
    pub total_stable_debt: BlockSeries<AssetDebt>,
    pub liquidity_rate: BlockSeries<f64>,
    pub variable_borrow_rate: BlockSeries<f64>,
}

impl AssetTotalSnapshot {
    pub fn new(contract: String, chain_height_range: ChainHeightRange) -> Self {
        Self {
            contract,
            chain_height_range,
            total_a_token: BlockSeries::new(),
            total_variable_debt: BlockSeries::new(),
            total_stable_debt: BlockSeries::new(),
            liquidity_rate: BlockSeries::new(),
            variable_borrow_rate: BlockSeries::new(),
        }
    }

    pub fn push_block(&mut self, block: u64, totals: &AssetBlockTotals) {
        self.total_a_token.insert(
            block,
            AssetSupply {
                token_supply: totals.total_supply,
                usd_supply: totals.supply_usd,
            },
        );
        self.total_variable_debt.insert(
            block,
            AssetDebt {
                token_debt: totals.variable_debt,
                usd_debt: totals.variable_debt_usd,
            },
        );
        self.total_stable_debt.insert(
            block,
            AssetDebt {
                token_debt: totals.stable_debt,
                usd_debt: totals.stable_debt_usd,
            },
        );
        self.liquidity_rate.insert(block, totals.liquidity_rate);
        self.variable_borrow_rate
            .insert(block, totals.variable_borrow_rate);
    }

    /// Supply and variable debt at the last block of the snapshot's range.
    pub fn latest(&self) -> Option<(&AssetSupply, &AssetDebt)> {
        let end = self.chain_height_range.end;
        Some((self.total_a_token.get(end)?, self.total_variable_debt.get(end)?))
    }
}
