pub mod abis;
pub mod chain;
pub mod config;
pub mod cron;
pub mod epochs;
pub mod error;
pub mod models;
pub mod processors;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainDataSource, RpcChainData};
pub use config::Settings;
pub use cron::{EpochCursor, EpochPipeline, EpochScheduler};
pub use epochs::{EpochTimeline, TailEpoch, TailEpochResolver};
pub use error::ComputeError;
pub use processors::{
    compute_sources, AggregateMarketStatsProcessor, AssetTotalsProcessor,
    PairTotalReservesProcessor, WalletInteractionProcessor,
};
pub use store::{FsSnapshotStore, MemorySnapshotStore, SnapshotReader, SnapshotStore};
