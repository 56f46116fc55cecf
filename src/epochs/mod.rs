//! Epoch history and tail epoch resolution.

mod timeline;

use anyhow::Result;
use async_trait::async_trait;

pub use timeline::{EpochTimeline, TimelineState};

/// Outcome of a tail lookup.
///
/// `extrapolated` is set when no real epoch old enough exists and the id was
/// clamped to the oldest usable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailEpoch {
    pub epoch_id: u64,
    pub extrapolated: bool,
}

#[async_trait]
pub trait TailEpochResolver: Send + Sync {
    /// Find the epoch that started about `distance_secs` before `current_epoch_id`.
    async fn resolve_tail_epoch(
        &self,
        current_epoch_id: u64,
        distance_secs: u64,
        project_id: &str,
    ) -> Result<TailEpoch>;
}
