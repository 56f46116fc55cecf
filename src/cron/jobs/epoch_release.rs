//! Job that releases the next epoch and runs every processor over it.
//!
//! One run:
//! - reads the chain head and cuts the next block range
//! - records the epoch start time on the timeline
//! - runs the pair and asset fan-outs, plus wallet interactions for single-block epochs
//! - persists every snapshot, then aggregates the asset snapshots into market stats
//! - persists the cursor so a restart resumes after the last released epoch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::chain::ChainDataSource;
use crate::config::{EpochSettings, Settings};
use crate::epochs::{EpochTimeline, TimelineState};
use crate::models::{CalculateAggregateMessage, Epoch, SnapshotProcessMessage, SnapshotSubmission};
use crate::processors::{
    compute_sources, AggregateMarketStatsProcessor, AssetTotalsProcessor,
    PairTotalReservesProcessor, WalletInteractionProcessor, TAIL_DISTANCE_SECS,
};
use crate::store::SnapshotStore;
use crate::utils::{aggregate_project_id, project_id, ProjectKind};

const CURSOR_FILE: &str = "cursor.json";

/// Progress of the epoch clock, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochCursor {
    pub last_epoch_id: u64,
    pub last_end_block: Option<u64>,
    #[serde(default)]
    pub timeline: TimelineState,
}

impl EpochCursor {
    pub fn path_in(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(CURSOR_FILE)
    }

    /// Read a persisted cursor. A missing file is a fresh start.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            },
        };

        let cursor = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupted epoch cursor at {}", path.display()))?;
        Ok(Some(cursor))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move cursor into {}", path.display()))?;
        Ok(())
    }
}

/// Next epoch to release given the chain head, or `None` when no new block exists.
///
/// The first epoch starts at `start_block`, or covers the last `size` blocks
/// up to `head` when no start block is configured.
pub fn next_epoch(cursor: &EpochCursor, head: u64, settings: &EpochSettings) -> Option<Epoch> {
    let size = settings.size.max(1);

    let begin = match cursor.last_end_block {
        Some(last_end) => last_end.checked_add(1)?,
        None => settings
            .start_block
            .unwrap_or_else(|| head.saturating_sub(size - 1)),
    };

    if begin > head {
        return None;
    }

    let end = head.min(begin.saturating_add(size - 1));
    Some(Epoch::new(cursor.last_epoch_id + 1, begin, end))
}

/// Every processor wired to one chain, one store and one epoch timeline.
pub struct EpochPipeline<S> {
    settings: Arc<Settings>,
    chain: Arc<dyn ChainDataSource>,
    store: Arc<S>,
    timeline: Arc<EpochTimeline>,
    pairs: PairTotalReservesProcessor,
    assets: AssetTotalsProcessor,
    wallets: WalletInteractionProcessor,
    aggregator: AggregateMarketStatsProcessor,
    // Held for the whole run; a tick that cannot take it is skipped.
    cursor: Mutex<EpochCursor>,
    cursor_path: Option<PathBuf>,
}

impl<S: SnapshotStore + 'static> EpochPipeline<S> {
    pub fn new(
        settings: Arc<Settings>,
        chain: Arc<dyn ChainDataSource>,
        store: Arc<S>,
        cursor: EpochCursor,
    ) -> Self {
        let timeline = Arc::new(EpochTimeline::from_state(cursor.timeline.clone()));

        Self {
            pairs: PairTotalReservesProcessor::new(chain.clone()),
            assets: AssetTotalsProcessor::new(chain.clone()),
            wallets: WalletInteractionProcessor::new(
                chain.clone(),
                &settings.sources.tracked_wallets,
            ),
            aggregator: AggregateMarketStatsProcessor::new(),
            settings,
            chain,
            store,
            timeline,
            cursor: Mutex::new(cursor),
            cursor_path: None,
        }
    }

    /// Persist the cursor to `path` after every released epoch.
    pub fn with_cursor_path(mut self, path: PathBuf) -> Self {
        self.cursor_path = Some(path);
        self
    }

    pub fn timeline(&self) -> Arc<EpochTimeline> {
        self.timeline.clone()
    }

    /// Release and process the next epoch.
    ///
    /// Returns the released epoch, or `None` when the run was skipped.
    pub async fn run(&self) -> Result<Option<Epoch>> {
        let Ok(mut cursor) = self.cursor.try_lock() else {
            warn!("Previous epoch still in flight, skipping this tick");
            return Ok(None);
        };

        let head = self
            .chain
            .latest_block()
            .await
            .context("Failed to read chain head")?;

        let Some(epoch) = next_epoch(&cursor, head, &self.settings.epochs) else {
            debug!("No new blocks since {:?} (head {})", cursor.last_end_block, head);
            return Ok(None);
        };

        let start = std::time::Instant::now();
        let msg = SnapshotProcessMessage::from(epoch);
        info!(
            "Releasing epoch {} [{}, {}]",
            msg.epoch_id, msg.begin, msg.end
        );

        let started_at = self
            .chain
            .block_timestamp(epoch.begin)
            .await
            .with_context(|| format!("Failed to read timestamp of block {}", epoch.begin))?;
        self.timeline.record_epoch(epoch.epoch_id, started_at).await;

        let namespace = self.settings.epochs.namespace.as_str();

        let pair_snapshots =
            compute_sources(&self.pairs, &self.settings.sources.pairs, &epoch).await?;
        for (source, snapshot) in &pair_snapshots {
            let project = project_id(ProjectKind::PairTotalReserves, source, namespace);
            self.persist(&project, epoch.epoch_id, serde_json::to_value(snapshot)?)
                .await?;
        }

        let asset_snapshots =
            compute_sources(&self.assets, &self.settings.sources.assets, &epoch).await?;
        let mut submissions = Vec::with_capacity(asset_snapshots.len());
        for (source, snapshot) in &asset_snapshots {
            let project = project_id(ProjectKind::AssetTotals, source, namespace);
            let cid = self
                .persist(&project, epoch.epoch_id, serde_json::to_value(snapshot)?)
                .await?;
            submissions.push(SnapshotSubmission {
                epoch_id: epoch.epoch_id,
                project_id: project,
                snapshot_cid: cid,
            });
        }

        if self.wallets.is_enabled() && epoch.begin == epoch.end {
            match self.wallets.compute(&epoch).await {
                Ok(interactions) => {
                    for (key, snapshot) in &interactions {
                        let project = project_id(ProjectKind::WalletInteraction, key, namespace);
                        self.persist(&project, epoch.epoch_id, serde_json::to_value(snapshot)?)
                            .await?;
                    }
                },
                Err(e) => warn!(
                    "Skipping wallet interactions for epoch {}: {}",
                    epoch.epoch_id, e
                ),
            }
        }

        if !self.settings.sources.assets.is_empty() {
            let project = aggregate_project_id(ProjectKind::AggregateMarketStats, namespace);
            self.timeline
                .mark_project_start(&project, epoch.epoch_id)
                .await;

            let aggregate = CalculateAggregateMessage {
                epoch_id: epoch.epoch_id,
                messages: submissions,
            };
            let stats = self
                .aggregator
                .compute(&aggregate, self.store.as_ref(), self.timeline.as_ref(), &project)
                .await
                .with_context(|| format!("Failed to aggregate epoch {}", epoch.epoch_id))?;

            self.persist(&project, epoch.epoch_id, serde_json::to_value(&stats)?)
                .await?;
        }

        self.timeline.prune(epoch.epoch_id, TAIL_DISTANCE_SECS).await;

        cursor.last_epoch_id = epoch.epoch_id;
        cursor.last_end_block = Some(epoch.end);
        cursor.timeline = self.timeline.state().await;

        if let Some(path) = &self.cursor_path {
            cursor.save(path).await?;
        }

        info!(
            "Completed epoch {} in {:?} ({} pairs, {} assets)",
            epoch.epoch_id,
            start.elapsed(),
            pair_snapshots.len(),
            asset_snapshots.len()
        );

        Ok(Some(epoch))
    }

    async fn persist(&self, project: &str, epoch_id: u64, payload: Value) -> Result<String> {
        let cid = self
            .store
            .put_snapshot(project, epoch_id, &payload)
            .await
            .with_context(|| format!("Failed to persist {} for epoch {}", project, epoch_id))?;

        debug!("Persisted {} for epoch {} as {}", project, epoch_id, cid);
        Ok(cid)
    }
}
