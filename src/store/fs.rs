use std::path::{Path, PathBuf};

use alloy::primitives::hex;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use moka::future::Cache;
use serde_json::Value;

use super::{canonical_bytes, SnapshotReader, SnapshotRef, SnapshotStore};
use crate::utils::content_id;

/// Content-addressed snapshot store on the local filesystem.
///
/// Layout:
///   - `{root}/blobs/{cid}.json` - payload bytes
///   - `{root}/index/{hex(project)}/{epoch_id}` - CID of the project's snapshot for that epoch
///
/// Blobs are immutable, so reads go through a CID-keyed cache.
#[derive(Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
    cache: Cache<String, Value>,
}

impl FsSnapshotStore {
    pub async fn new(root: impl AsRef<Path>, cache_capacity: u64) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        tokio::fs::create_dir_all(root.join("blobs"))
            .await
            .with_context(|| format!("Failed to create blob dir under {}", root.display()))?;
        tokio::fs::create_dir_all(root.join("index"))
            .await
            .with_context(|| format!("Failed to create index dir under {}", root.display()))?;

        info!("Snapshot store opened at {}", root.display());

        Ok(Self {
            root,
            cache: Cache::builder().max_capacity(cache_capacity).build(),
        })
    }

    fn blob_path(&self, cid: &str) -> PathBuf {
        self.root.join("blobs").join(format!("{}.json", cid))
    }

    fn index_path(&self, project_id: &str, epoch_id: u64) -> PathBuf {
        self.root
            .join("index")
            .join(hex::encode(project_id.as_bytes()))
            .join(epoch_id.to_string())
    }

    async fn read_blob(&self, cid: &str) -> Result<Option<Value>> {
        if let Some(cached) = self.cache.get(cid).await {
            return Ok(Some(cached));
        }

        if !is_cid(cid) {
            debug!("Snapshot reference {:?} is not a content id", cid);
            return Ok(None);
        }

        let path = self.blob_path(cid);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Snapshot {} not found in store", cid);
                return Ok(None);
            },
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            },
        };

        let value: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("Stored snapshot {} is not valid JSON", cid))?;

        self.cache.insert(cid.to_string(), value.clone()).await;
        Ok(Some(value))
    }
}

#[async_trait]
impl SnapshotReader for FsSnapshotStore {
    async fn get_snapshots_bulk(&self, refs: &[SnapshotRef]) -> Result<Vec<Option<Value>>> {
        let reads = refs.iter().map(|r| self.read_blob(&r.cid));
        futures::future::join_all(reads).await.into_iter().collect()
    }

    async fn get_epoch_snapshot(&self, epoch_id: u64, project_id: &str) -> Result<Option<Value>> {
        let path = self.index_path(project_id, epoch_id);
        let cid = match tokio::fs::read_to_string(&path).await {
            Ok(cid) => cid,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            },
        };

        self.read_blob(cid.trim()).await
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn put_snapshot(
        &self,
        project_id: &str,
        epoch_id: u64,
        payload: &Value,
    ) -> Result<String> {
        let bytes = canonical_bytes(payload)?;
        let cid = content_id(&bytes);

        let blob_path = self.blob_path(&cid);
        if tokio::fs::try_exists(&blob_path).await.unwrap_or(false) {
            debug!("Snapshot {} already stored", cid);
        } else {
            write_atomic(&blob_path, &bytes).await?;
        }

        let index_path = self.index_path(project_id, epoch_id);
        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        write_atomic(&index_path, cid.as_bytes()).await?;

        self.cache.insert(cid.clone(), payload.clone()).await;
        Ok(cid)
    }
}

/// Write through a temp file and rename so readers never see partial payloads.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Keep identifiers usable as single path components on every platform.
/// `0x` followed by hex digits, the only shape `content_id` produces.
fn is_cid(id: &str) -> bool {
    id.strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()))
}
