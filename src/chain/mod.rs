//! Chain data layer.
//!
//! Turns contract calls into dense per-block records. Implementations own
//! batching, caching and retries; callers see one bulk call per source.

mod rpc;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ComputeError;
use crate::models::{AssetBlockTotals, PairBlockReserves, TxInteraction};

pub use rpc::RpcChainData;

#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Reserves and USD prices of `pair` for every block of `[from_block, to_block]`.
    async fn fetch_pair_reserves(
        &self,
        pair: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, PairBlockReserves>, ComputeError>;

    /// Lending supply and debt totals of `asset` for every block of `[from_block, to_block]`.
    async fn fetch_asset_totals(
        &self,
        asset: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, AssetBlockTotals>, ComputeError>;

    /// Receipts of every transaction included in `block`.
    async fn block_interactions(&self, block: u64) -> Result<Vec<TxInteraction>, ComputeError>;

    async fn latest_block(&self) -> Result<u64, ComputeError>;

    /// Unix timestamp of `block`, in seconds.
    async fn block_timestamp(&self, block: u64) -> Result<u64, ComputeError>;
}
