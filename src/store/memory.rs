use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{canonical_bytes, SnapshotReader, SnapshotRef, SnapshotStore};
use crate::utils::content_id;

/// In-process snapshot store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    blobs: RwLock<HashMap<String, Value>>,
    index: RwLock<HashMap<(String, u64), String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw payload under an arbitrary CID without indexing it.
    pub async fn insert_blob(&self, cid: &str, payload: Value) {
        self.blobs.write().await.insert(cid.to_string(), payload);
    }
}

#[async_trait]
impl SnapshotReader for MemorySnapshotStore {
    async fn get_snapshots_bulk(&self, refs: &[SnapshotRef]) -> Result<Vec<Option<Value>>> {
        let blobs = self.blobs.read().await;
        Ok(refs.iter().map(|r| blobs.get(&r.cid).cloned()).collect())
    }

    async fn get_epoch_snapshot(&self, epoch_id: u64, project_id: &str) -> Result<Option<Value>> {
        let cid = self
            .index
            .read()
            .await
            .get(&(project_id.to_string(), epoch_id))
            .cloned();

        match cid {
            Some(cid) => Ok(self.blobs.read().await.get(&cid).cloned()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put_snapshot(
        &self,
        project_id: &str,
        epoch_id: u64,
        payload: &Value,
    ) -> Result<String> {
        let cid = content_id(&canonical_bytes(payload)?);

        self.blobs.write().await.insert(cid.clone(), payload.clone());
        self.index
            .write()
            .await
            .insert((project_id.to_string(), epoch_id), cid.clone());

        Ok(cid)
    }
}
