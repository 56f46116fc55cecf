//! Snapshot processors.
//!
//! - [`pair_reserves`] and [`asset_totals`] build dense per-block series for one source
//! - [`fanout`] runs a series builder over every configured source
//! - [`market_stats`] rolls asset snapshots into an epoch aggregate
//! - [`wallet_interaction`] reports single-block transactions of tracked wallets

pub mod asset_totals;
pub mod fanout;
pub mod market_stats;
pub mod pair_reserves;
pub mod wallet_interaction;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ComputeError;

pub use asset_totals::AssetTotalsProcessor;
pub use fanout::compute_sources;
pub use market_stats::{percent_change, AggregateMarketStatsProcessor, TAIL_DISTANCE_SECS};
pub use pair_reserves::PairTotalReservesProcessor;
pub use wallet_interaction::WalletInteractionProcessor;

/// Post-processing step applied to a finished snapshot.
pub type SnapshotTransform<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

pub(crate) fn apply_transforms<T>(transforms: &[SnapshotTransform<T>], snapshot: T) -> T {
    transforms
        .iter()
        .fold(snapshot, |snapshot, transform| transform(snapshot))
}

/// Builds the per-block series of one source over an inclusive block range.
#[async_trait]
pub trait SeriesBuilder: Send + Sync {
    type Snapshot: Serialize + Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn compute_single(
        &self,
        source: &str,
        min_chain_height: u64,
        max_chain_height: u64,
    ) -> Result<Self::Snapshot, ComputeError>;
}
