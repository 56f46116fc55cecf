//! Snapshot storage.
//!
//! Payloads are content addressed: the CID of a snapshot is the keccak256 of
//! its canonical JSON bytes. An index maps `(project_id, epoch_id)` to the CID
//! so aggregates of earlier epochs can be looked up by epoch.

mod fs;
mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Reference to a stored snapshot, as listed in an aggregate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub cid: String,
    pub project_id: String,
}

/// Read side used by the aggregation engine. Absence is `None`, never an error.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Fetch every referenced payload, in input order.
    async fn get_snapshots_bulk(&self, refs: &[SnapshotRef]) -> Result<Vec<Option<Value>>>;

    /// Fetch the payload a project produced for `epoch_id`.
    async fn get_epoch_snapshot(&self, epoch_id: u64, project_id: &str) -> Result<Option<Value>>;
}

/// Full store used by the scheduler to persist computed snapshots.
#[async_trait]
pub trait SnapshotStore: SnapshotReader {
    /// Persist `payload` for `(project_id, epoch_id)` and return its CID.
    async fn put_snapshot(&self, project_id: &str, epoch_id: u64, payload: &Value)
        -> Result<String>;
}

/// Canonical bytes of a payload: compact JSON with object keys sorted at every level.
pub(crate) fn canonical_bytes(payload: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&sorted(payload))?)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        },
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
