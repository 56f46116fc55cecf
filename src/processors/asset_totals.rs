use std::sync::Arc;

use async_trait::async_trait;

use super::{apply_transforms, SeriesBuilder, SnapshotTransform};
use crate::chain::ChainDataSource;
use crate::error::ComputeError;
use crate::models::{AssetTotalSnapshot, ChainHeightRange};

/// Per-block supply, debt and rates of a lending asset.
pub struct AssetTotalsProcessor {
    chain: Arc<dyn ChainDataSource>,
    transforms: Vec<SnapshotTransform<AssetTotalSnapshot>>,
}

impl AssetTotalsProcessor {
    pub fn new(chain: Arc<dyn ChainDataSource>) -> Self {
        Self {
            chain,
            transforms: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: SnapshotTransform<AssetTotalSnapshot>) -> Self {
        self.transforms.push(transform);
        self
    }
}

#[async_trait]
impl SeriesBuilder for AssetTotalsProcessor {
    type Snapshot = AssetTotalSnapshot;

    fn name(&self) -> &'static str {
        "asset_totals"
    }

    async fn compute_single(
        &self,
        source: &str,
        min_chain_height: u64,
        max_chain_height: u64,
    ) -> Result<AssetTotalSnapshot, ComputeError> {
        if max_chain_height < min_chain_height {
            return Err(ComputeError::InvalidRange {
                min: min_chain_height,
                max: max_chain_height,
            });
        }

        let asset_totals = self
            .chain
            .fetch_asset_totals(source, min_chain_height, max_chain_height)
            .await?;

        if asset_totals.is_empty() {
            return Err(ComputeError::NoData(source.to_string()));
        }

        let mut snapshot = AssetTotalSnapshot::new(
            source.to_string(),
            ChainHeightRange {
                begin: min_chain_height,
                end: max_chain_height,
            },
        );

        for block in min_chain_height..=max_chain_height {
            let totals = asset_totals
                .get(&block)
                .ok_or_else(|| ComputeError::MissingBlock {
                    source_address: source.to_string(),
                    block,
                })?;
            snapshot.push_block(block, totals);
        }

        Ok(apply_transforms(&self.transforms, snapshot))
    }
}
