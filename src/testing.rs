//! Deterministic in-memory chain used by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;

use async_trait::async_trait;

use crate::chain::ChainDataSource;
use crate::error::ComputeError;
use crate::models::{
    AssetBlockTotals, AssetTotalSnapshot, ChainHeightRange, PairBlockReserves, TxInteraction,
};

pub const PAIR_A: &str = "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc";
pub const PAIR_B: &str = "0x0d4a11d5eeaac28ec3f61d100daf4d40471f1852";
pub const PAIR_C: &str = "0xa478c2975ab1ea89e8196811f51a7b7ade33eb11";

pub const ASSET_USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const ASSET_WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
pub const ASSET_DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME_SECS: u64 = 12;

/// Reserves the mock reports for any pair at `block`.
pub fn pair_reserves_at(block: u64) -> PairBlockReserves {
    let token0 = 1_000.0 + block as f64;
    let token1 = 2_000_000.0 + 2.0 * block as f64;
    let token0_price = token1 / token0;

    PairBlockReserves {
        token0,
        token1,
        token0_usd: token0 * token0_price,
        token1_usd: token1,
        token0_price,
        token1_price: 1.0,
    }
}

fn asset_totals(supply_usd: f64, debt_usd: f64) -> AssetBlockTotals {
    AssetBlockTotals {
        total_supply: supply_usd,
        supply_usd,
        variable_debt: debt_usd,
        variable_debt_usd: debt_usd,
        stable_debt: 0.0,
        stable_debt_usd: 0.0,
        liquidity_rate: 0.03,
        variable_borrow_rate: 0.05,
        price_usd: 1.0,
    }
}

/// Asset snapshot over `[begin, end]` with constant USD supply and debt.
pub fn asset_snapshot(
    asset: &str,
    begin: u64,
    end: u64,
    supply_usd: f64,
    debt_usd: f64,
) -> AssetTotalSnapshot {
    let mut snapshot = AssetTotalSnapshot::new(asset.to_string(), ChainHeightRange { begin, end });
    let totals = asset_totals(supply_usd, debt_usd);
    for block in begin..=end {
        snapshot.push_block(block, &totals);
    }
    snapshot
}

pub fn tx(hash: &str, from: &str, to: Option<&str>, block_number: u64) -> TxInteraction {
    TxInteraction {
        tx_hash: hash.to_string(),
        from: from.to_string(),
        to: to.map(str::to_string),
        block_number,
        status: true,
    }
}

#[derive(Default)]
pub struct MockChain {
    pairs: HashMap<String, BTreeMap<u64, PairBlockReserves>>,
    assets: HashMap<String, BTreeMap<u64, AssetBlockTotals>>,
    interactions: HashMap<u64, Vec<TxInteraction>>,
    failing: HashSet<String>,
    head: u64,
    block_time: Option<u64>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(mut self, pair: &str, blocks: RangeInclusive<u64>) -> Self {
        let head = *blocks.end();
        let series = self.pairs.entry(pair.to_string()).or_default();
        for block in blocks {
            series.insert(block, pair_reserves_at(block));
        }
        self.head = self.head.max(head);
        self
    }

    pub fn with_asset(
        mut self,
        asset: &str,
        blocks: RangeInclusive<u64>,
        supply_usd: f64,
        debt_usd: f64,
    ) -> Self {
        let head = *blocks.end();
        let series = self.assets.entry(asset.to_string()).or_default();
        for block in blocks {
            series.insert(block, asset_totals(supply_usd, debt_usd));
        }
        self.head = self.head.max(head);
        self
    }

    pub fn without_block(mut self, source: &str, block: u64) -> Self {
        if let Some(series) = self.pairs.get_mut(source) {
            series.remove(&block);
        }
        if let Some(series) = self.assets.get_mut(source) {
            series.remove(&block);
        }
        self
    }

    pub fn with_interactions(mut self, block: u64, txs: Vec<TxInteraction>) -> Self {
        self.interactions.insert(block, txs);
        self.head = self.head.max(block);
        self
    }

    /// Every fetch for `source` fails as an exhausted RPC call.
    pub fn failing(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    pub fn with_head(mut self, head: u64) -> Self {
        self.head = head;
        self
    }

    /// Seconds between consecutive block timestamps.
    pub fn with_block_time(mut self, secs: u64) -> Self {
        self.block_time = Some(secs);
        self
    }

    fn check(&self, source: &str) -> Result<(), ComputeError> {
        if self.failing.contains(source) {
            return Err(ComputeError::rpc(
                source,
                anyhow::anyhow!("request timed out"),
            ));
        }
        Ok(())
    }
}

fn slice<T: Copy>(series: Option<&BTreeMap<u64, T>>, from: u64, to: u64) -> BTreeMap<u64, T> {
    series
        .map(|s| s.range(from..=to).map(|(k, v)| (*k, *v)).collect())
        .unwrap_or_default()
}

#[async_trait]
impl ChainDataSource for MockChain {
    async fn fetch_pair_reserves(
        &self,
        pair: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, PairBlockReserves>, ComputeError> {
        self.check(pair)?;
        Ok(slice(self.pairs.get(pair), from_block, to_block))
    }

    async fn fetch_asset_totals(
        &self,
        asset: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, AssetBlockTotals>, ComputeError> {
        self.check(asset)?;
        Ok(slice(self.assets.get(asset), from_block, to_block))
    }

    async fn block_interactions(&self, block: u64) -> Result<Vec<TxInteraction>, ComputeError> {
        Ok(self.interactions.get(&block).cloned().unwrap_or_default())
    }

    async fn latest_block(&self) -> Result<u64, ComputeError> {
        Ok(self.head)
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, ComputeError> {
        Ok(GENESIS_TIMESTAMP + block * self.block_time.unwrap_or(BLOCK_TIME_SECS))
    }
}
