use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{TailEpoch, TailEpochResolver};

/// Serializable history of released epochs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineState {
    /// epoch id -> unix timestamp of the epoch's first block
    pub epochs: BTreeMap<u64, u64>,
    /// project id -> first epoch the project produced a snapshot for
    pub project_starts: BTreeMap<String, u64>,
}

/// Epoch start times, used to walk back a fixed time distance.
#[derive(Default)]
pub struct EpochTimeline {
    state: RwLock<TimelineState>,
}

impl EpochTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: TimelineState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn state(&self) -> TimelineState {
        self.state.read().await.clone()
    }

    pub async fn record_epoch(&self, epoch_id: u64, start_timestamp: u64) {
        self.state
            .write()
            .await
            .epochs
            .insert(epoch_id, start_timestamp);
    }

    /// Remember the first epoch of a project. Later calls are ignored.
    pub async fn mark_project_start(&self, project_id: &str, epoch_id: u64) -> bool {
        let mut state = self.state.write().await;
        if state.project_starts.contains_key(project_id) {
            return false;
        }
        state.project_starts.insert(project_id.to_string(), epoch_id);
        true
    }

    pub async fn start_of(&self, epoch_id: u64) -> Option<u64> {
        self.state.read().await.epochs.get(&epoch_id).copied()
    }

    /// Forget epochs that no later tail lookup at `distance_secs` can pick.
    ///
    /// The newest epoch starting at or before `start(current) - distance` is
    /// kept; everything older is dropped. Returns the number of removed epochs.
    pub async fn prune(&self, current_epoch_id: u64, distance_secs: u64) -> usize {
        let mut state = self.state.write().await;

        let Some(target) = state
            .epochs
            .get(&current_epoch_id)
            .and_then(|start| start.checked_sub(distance_secs))
        else {
            return 0;
        };

        let oldest_kept = state
            .epochs
            .range(..=current_epoch_id)
            .rev()
            .find(|(_, start)| **start <= target)
            .map(|(id, _)| *id);

        let Some(oldest_kept) = oldest_kept else {
            return 0;
        };

        let before = state.epochs.len();
        state.epochs = state.epochs.split_off(&oldest_kept);
        let removed = before - state.epochs.len();

        if removed > 0 {
            debug!("Pruned {} epochs older than {}", removed, oldest_kept);
        }
        removed
    }
}

#[async_trait]
impl TailEpochResolver for EpochTimeline {
    async fn resolve_tail_epoch(
        &self,
        current_epoch_id: u64,
        distance_secs: u64,
        project_id: &str,
    ) -> Result<TailEpoch> {
        let state = self.state.read().await;
        let tail = resolve(&state, current_epoch_id, distance_secs, project_id);
        debug!(
            "Tail of epoch {} at -{}s for {}: {:?}",
            current_epoch_id, distance_secs, project_id, tail
        );
        Ok(tail)
    }
}

/// Walk back from `current` to the epoch whose start is closest to
/// `start(current) - distance`. Ties go to the older epoch.
fn resolve(state: &TimelineState, current: u64, distance: u64, project_id: &str) -> TailEpoch {
    let Some(&current_start) = state.epochs.get(&current) else {
        return TailEpoch {
            epoch_id: current,
            extrapolated: true,
        };
    };

    let floor = state.project_starts.get(project_id).copied();
    let earliest = state
        .epochs
        .range(floor.unwrap_or(0)..=current)
        .next()
        .map(|(id, _)| *id)
        .unwrap_or(current);
    let clamped = TailEpoch {
        epoch_id: earliest,
        extrapolated: true,
    };

    let Some(target) = current_start.checked_sub(distance) else {
        return clamped;
    };

    let mut newer: Option<(u64, u64)> = None;
    for (&id, &start) in state.epochs.range(..=current).rev() {
        if start > target {
            newer = Some((id, start));
            continue;
        }

        let chosen = match newer {
            Some((newer_id, newer_start)) if newer_start - target < target - start => newer_id,
            _ => id,
        };

        return match floor {
            Some(floor) if chosen < floor => TailEpoch {
                epoch_id: floor,
                extrapolated: true,
            },
            _ => TailEpoch {
                epoch_id: chosen,
                extrapolated: false,
            },
        };
    }

    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600;
    const DAY: u64 = 86_400;
    const GENESIS: u64 = 1_700_000_000;

    /// Epochs 1..=n, one per hour.
    fn hourly(n: u64) -> TimelineState {
        TimelineState {
            epochs: (1..=n).map(|id| (id, GENESIS + (id - 1) * HOUR)).collect(),
            project_starts: BTreeMap::new(),
        }
    }

    #[test]
    fn test_exact_day_back() {
        let state = hourly(30);
        assert_eq!(
            resolve(&state, 30, DAY, "stats"),
            TailEpoch {
                epoch_id: 6,
                extrapolated: false
            }
        );
    }

    #[test]
    fn test_insufficient_history_is_extrapolated() {
        let state = hourly(10);
        assert_eq!(
            resolve(&state, 10, DAY, "stats"),
            TailEpoch {
                epoch_id: 1,
                extrapolated: true
            }
        );
    }

    #[test]
    fn test_unknown_current_epoch_is_extrapolated() {
        let state = hourly(3);
        let tail = resolve(&state, 99, DAY, "stats");
        assert!(tail.extrapolated);
        assert_eq!(tail.epoch_id, 99);
    }

    #[test]
    fn test_picks_closest_start() {
        let state = TimelineState {
            epochs: BTreeMap::from([(1, 1_000), (2, 1_100), (3, 1_190), (4, 1_300)]),
            project_starts: BTreeMap::new(),
        };
        // target 1_150: epoch 3 is 40s away, epoch 2 is 50s away
        assert_eq!(resolve(&state, 4, 150, "stats").epoch_id, 3);
        // target 1_145: tie at 45s goes to the older epoch
        let tie = TimelineState {
            epochs: BTreeMap::from([(1, 1_000), (2, 1_100), (3, 1_190), (4, 1_345)]),
            project_starts: BTreeMap::new(),
        };
        assert_eq!(resolve(&tie, 4, 200, "stats").epoch_id, 2);
    }

    #[test]
    fn test_tail_before_project_start_is_clamped() {
        let mut state = hourly(30);
        state.project_starts.insert("stats".into(), 8);

        assert_eq!(
            resolve(&state, 30, DAY, "stats"),
            TailEpoch {
                epoch_id: 8,
                extrapolated: true
            }
        );
        // other projects are unaffected
        assert!(!resolve(&state, 30, DAY, "other").extrapolated);
    }

    #[tokio::test]
    async fn test_project_start_is_recorded_once() {
        let timeline = EpochTimeline::new();
        assert!(timeline.mark_project_start("stats", 4).await);
        assert!(!timeline.mark_project_start("stats", 9).await);
        assert_eq!(timeline.state().await.project_starts["stats"], 4);
    }

    #[tokio::test]
    async fn test_prune_keeps_every_epoch_a_later_tail_can_pick() {
        let timeline = EpochTimeline::from_state(hourly(40));

        // target of epoch 40 is the start of epoch 16
        assert_eq!(timeline.prune(40, DAY).await, 15);
        let state = timeline.state().await;
        assert_eq!(state.epochs.keys().next(), Some(&16));
        assert_eq!(state.epochs.len(), 25);

        timeline.record_epoch(41, GENESIS + 40 * HOUR).await;
        let tail = timeline.resolve_tail_epoch(41, DAY, "stats").await.unwrap();
        assert_eq!(
            tail,
            TailEpoch {
                epoch_id: 17,
                extrapolated: false
            }
        );
    }

    #[tokio::test]
    async fn test_prune_without_enough_history_is_a_no_op() {
        let timeline = EpochTimeline::from_state(hourly(10));
        assert_eq!(timeline.prune(10, DAY).await, 0);
        assert_eq!(timeline.prune(99, DAY).await, 0);
        assert_eq!(timeline.state().await.epochs.len(), 10);
    }

    #[tokio::test]
    async fn test_resolver_uses_recorded_epochs() {
        let timeline = EpochTimeline::from_state(hourly(25));
        timeline.record_epoch(26, GENESIS + 25 * HOUR).await;

        let tail = timeline.resolve_tail_epoch(26, DAY, "stats").await.unwrap();
        assert_eq!(
            tail,
            TailEpoch {
                epoch_id: 2,
                extrapolated: false
            }
        );
        assert_eq!(timeline.start_of(26).await, Some(GENESIS + 25 * HOUR));
    }
}
