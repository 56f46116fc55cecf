use std::collections::BTreeMap;

use log::{debug, info};

use super::{apply_transforms, SnapshotTransform};
use crate::epochs::TailEpochResolver;
use crate::error::ComputeError;
use crate::models::{AssetTotalSnapshot, CalculateAggregateMessage, MarketStatsSnapshot};
use crate::store::{SnapshotReader, SnapshotRef};

/// Distance between an epoch and the tail epoch its changes are measured against.
pub const TAIL_DISTANCE_SECS: u64 = 86_400;

/// Rolls per-asset supply/debt snapshots into market totals with 24h changes.
///
/// Each asset contributes the values at the last block of its own range.
/// Change fields are only filled, and `complete` only set, when the tail
/// epoch is real and its aggregate is stored.
#[derive(Default)]
pub struct AggregateMarketStatsProcessor {
    transforms: Vec<SnapshotTransform<MarketStatsSnapshot>>,
}

impl AggregateMarketStatsProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, transform: SnapshotTransform<MarketStatsSnapshot>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub async fn compute(
        &self,
        msg: &CalculateAggregateMessage,
        store: &dyn SnapshotReader,
        resolver: &dyn TailEpochResolver,
        project_id: &str,
    ) -> Result<MarketStatsSnapshot, ComputeError> {
        info!(
            "Calculating market stats for epoch {} from {} submissions",
            msg.epoch_id,
            msg.messages.len()
        );

        let refs: Vec<SnapshotRef> = msg
            .messages
            .iter()
            .map(|m| SnapshotRef {
                cid: m.snapshot_cid.clone(),
                project_id: m.project_id.clone(),
            })
            .collect();

        let payloads = store
            .get_snapshots_bulk(&refs)
            .await
            .map_err(ComputeError::Storage)?;

        if payloads.len() != refs.len() {
            return Err(ComputeError::Storage(anyhow::anyhow!(
                "bulk fetch returned {} payloads for {} references",
                payloads.len(),
                refs.len()
            )));
        }

        // Keyed by project so a resubmitted snapshot replaces the earlier one.
        let mut snapshot_mapping: BTreeMap<&str, AssetTotalSnapshot> = BTreeMap::new();
        for (submission, payload) in msg.messages.iter().zip(payloads) {
            let Some(payload) = payload else {
                debug!("Retrieved snapshot with no data: {:?}", submission);
                continue;
            };
            let snapshot: AssetTotalSnapshot = serde_json::from_value(payload)?;
            snapshot_mapping.insert(submission.project_id.as_str(), snapshot);
        }

        let mut stats = MarketStatsSnapshot::new(msg.epoch_id);

        for (project, snapshot) in &snapshot_mapping {
            let (supply, debt) = snapshot.latest().ok_or_else(|| {
                ComputeError::Malformed(format!(
                    "snapshot of {} has no entry for its last block {}",
                    project, snapshot.chain_height_range.end
                ))
            })?;

            stats.total_available += supply.usd_supply;
            stats.total_borrows += debt.usd_debt;
        }
        stats.total_market_size = stats.total_available + stats.total_borrows;

        let tail = resolver
            .resolve_tail_epoch(msg.epoch_id, TAIL_DISTANCE_SECS, project_id)
            .await
            .map_err(ComputeError::Resolver)?;

        if tail.extrapolated {
            debug!(
                "Tail epoch {} for epoch {} is extrapolated, leaving changes unset",
                tail.epoch_id, msg.epoch_id
            );
        } else {
            let previous = store
                .get_epoch_snapshot(tail.epoch_id, project_id)
                .await
                .map_err(ComputeError::Storage)?;

            match previous {
                Some(payload) => {
                    let previous: MarketStatsSnapshot = serde_json::from_value(payload)?;

                    stats.market_change_24h =
                        percent_change(stats.total_market_size, previous.total_market_size);
                    stats.available_change_24h =
                        percent_change(stats.total_available, previous.total_available);
                    stats.borrow_change_24h =
                        percent_change(stats.total_borrows, previous.total_borrows);

                    stats.complete = true;
                },
                None => {
                    debug!(
                        "No market stats stored for tail epoch {} of {}",
                        tail.epoch_id, project_id
                    );
                },
            }
        }

        let stats = apply_transforms(&self.transforms, stats);
        info!("Got market stats data: {:?}", stats);

        Ok(stats)
    }
}

/// Percentage change from `previous` to `current`; 0.0 when `previous` is not positive.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 && previous.is_finite() {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}
