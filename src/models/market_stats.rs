use serde::{Deserialize, Serialize};

/// Cross-asset market summary for one epoch.
///
/// Change fields are percentages against the aggregate of the tail epoch and
/// stay at zero unless `complete` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatsSnapshot {
    pub epoch_id: u64,
    pub total_market_size: f64,
    pub total_available: f64,
    pub total_borrows: f64,
    pub market_change_24h: f64,
    pub available_change_24h: f64,
    pub borrow_change_24h: f64,
    pub complete: bool,
}

impl MarketStatsSnapshot {
    pub fn new(epoch_id: u64) -> Self {
        Self {
            epoch_id,
            ..Default::default()
        }
    }
}
