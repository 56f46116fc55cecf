mod asset_totals;
mod epoch;
mod market_stats;
mod messages;
mod pair_reserves;
mod series;
mod wallet;

pub use asset_totals::{AssetBlockTotals, AssetDebt, AssetSupply, AssetTotalSnapshot};
pub use epoch::{ChainHeightRange, Epoch};
pub use market_stats::MarketStatsSnapshot;
pub use messages::{CalculateAggregateMessage, SnapshotProcessMessage, SnapshotSubmission};
pub use pair_reserves::{PairBlockReserves, PairTotalReservesSnapshot};
pub use series::{block_key, BlockSeries};
pub use wallet::{TxInteraction, WalletInteractionSnapshot};
