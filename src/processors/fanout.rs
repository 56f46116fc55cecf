use std::time::Instant;

use futures::future::join_all;
use log::{debug, error, info, warn};

use super::SeriesBuilder;
use crate::error::ComputeError;
use crate::models::Epoch;

/// Run `builder` for every source over the epoch's block range.
///
/// All sources are awaited concurrently on the calling task. A source whose
/// computation fails is logged and left out; the remaining results keep the
/// order of `sources`. Only a malformed epoch fails the whole call.
pub async fn compute_sources<B>(
    builder: &B,
    sources: &[String],
    epoch: &Epoch,
) -> Result<Vec<(String, B::Snapshot)>, ComputeError>
where
    B: SeriesBuilder + ?Sized,
{
    epoch.validate()?;

    let start = Instant::now();
    debug!(
        "{} computation init for epoch {} [{}, {}] ({} blocks) over {} sources",
        builder.name(),
        epoch.epoch_id,
        epoch.begin,
        epoch.end,
        epoch.block_count(),
        sources.len()
    );

    let tasks = sources
        .iter()
        .map(|source| builder.compute_single(source, epoch.begin, epoch.end));
    let outcomes = join_all(tasks).await;

    let mut snapshots = Vec::with_capacity(sources.len());
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(snapshot) => snapshots.push((source.clone(), snapshot)),
            Err(e) if e.is_transient() => {
                warn!(
                    "Skipping {} snapshot for {} in epoch {}: {}",
                    builder.name(),
                    source,
                    epoch.epoch_id,
                    e
                );
            },
            Err(e) => {
                error!(
                    "Error while computing {} snapshot for {} in epoch {}: {}",
                    builder.name(),
                    source,
                    epoch.epoch_id,
                    e
                );
            },
        }
    }

    info!(
        "{} computed {}/{} sources for epoch {} in {:?}",
        builder.name(),
        snapshots.len(),
        sources.len(),
        epoch.epoch_id,
        start.elapsed()
    );

    Ok(snapshots)
}
