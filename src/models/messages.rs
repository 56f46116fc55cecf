use serde::{Deserialize, Serialize};

use super::Epoch;

/// Scheduler message releasing an epoch to the series processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotProcessMessage {
    pub epoch_id: u64,
    pub begin: u64,
    pub end: u64,
}

impl From<Epoch> for SnapshotProcessMessage {
    fn from(epoch: Epoch) -> Self {
        Self {
            epoch_id: epoch.epoch_id,
            begin: epoch.begin,
            end: epoch.end,
        }
    }
}

/// Reference to one persisted source snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSubmission {
    pub epoch_id: u64,
    pub project_id: String,
    pub snapshot_cid: String,
}

/// Scheduler message asking for the aggregate of one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateAggregateMessage {
    pub epoch_id: u64,
    pub messages: Vec<SnapshotSubmission>,
}
