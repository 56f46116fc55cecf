use std::sync::Arc;

use async_trait::async_trait;

use super::{apply_transforms, SeriesBuilder, SnapshotTransform};
use crate::chain::ChainDataSource;
use crate::error::ComputeError;
use crate::models::{ChainHeightRange, PairTotalReservesSnapshot};

/// Per-block reserves, USD reserves and USD prices of an AMM pair.
pub struct PairTotalReservesProcessor {
    chain: Arc<dyn ChainDataSource>,
    transforms: Vec<SnapshotTransform<PairTotalReservesSnapshot>>,
}

impl PairTotalReservesProcessor {
    pub fn new(chain: Arc<dyn ChainDataSource>) -> Self {
        Self {
            chain,
            transforms: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: SnapshotTransform<PairTotalReservesSnapshot>) -> Self {
        self.transforms.push(transform);
        self
    }
}

#[async_trait]
impl SeriesBuilder for PairTotalReservesProcessor {
    type Snapshot = PairTotalReservesSnapshot;

    fn name(&self) -> &'static str {
        "pair_total_reserves"
    }

    async fn compute_single(
        &self,
        source: &str,
        min_chain_height: u64,
        max_chain_height: u64,
    ) -> Result<PairTotalReservesSnapshot, ComputeError> {
        if max_chain_height < min_chain_height {
            return Err(ComputeError::InvalidRange {
                min: min_chain_height,
                max: max_chain_height,
            });
        }

        let pair_reserve_total = self
            .chain
            .fetch_pair_reserves(source, min_chain_height, max_chain_height)
            .await?;

        if pair_reserve_total.is_empty() {
            return Err(ComputeError::NoData(source.to_string()));
        }

        let mut snapshot = PairTotalReservesSnapshot::new(
            source.to_string(),
            ChainHeightRange {
                begin: min_chain_height,
                end: max_chain_height,
            },
        );

        for block in min_chain_height..=max_chain_height {
            let reserves =
                pair_reserve_total
                    .get(&block)
                    .ok_or_else(|| ComputeError::MissingBlock {
                        source_address: source.to_string(),
                        block,
                    })?;
            snapshot.push_block(block, reserves);
        }

        Ok(apply_transforms(&self.transforms, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pair_reserves_at, MockChain, PAIR_A};

    #[tokio::test]
    async fn test_series_is_dense_over_inclusive_range() {
        let chain = MockChain::new().with_pair(PAIR_A, 100..=110);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain));

        let snapshot = processor.compute_single(PAIR_A, 100, 104).await.unwrap();

        assert_eq!(snapshot.contract, PAIR_A);
        assert_eq!(snapshot.chain_height_range, ChainHeightRange { begin: 100, end: 104 });
        for series in [
            &snapshot.token0_reserves,
            &snapshot.token1_reserves,
            &snapshot.token0_reserves_usd,
            &snapshot.token1_reserves_usd,
            &snapshot.token0_prices,
            &snapshot.token1_prices,
        ] {
            assert_eq!(series.len(), 5);
            assert!(series.covers(100, 104));
        }

        let expected = pair_reserves_at(102);
        assert_eq!(snapshot.token0_reserves.get(102), Some(&expected.token0));
        assert_eq!(snapshot.token1_reserves_usd.get(102), Some(&expected.token1_usd));
        assert_eq!(snapshot.token1_prices.get(102), Some(&expected.token1_price));
    }

    #[tokio::test]
    async fn test_single_block_range() {
        let chain = MockChain::new().with_pair(PAIR_A, 100..=100);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain));

        let snapshot = processor.compute_single(PAIR_A, 100, 100).await.unwrap();
        assert_eq!(snapshot.token0_reserves.len(), 1);
    }

    #[tokio::test]
    async fn test_recomputation_is_byte_identical() {
        let chain = Arc::new(MockChain::new().with_pair(PAIR_A, 100..=120));
        let processor = PairTotalReservesProcessor::new(chain);

        let first = processor.compute_single(PAIR_A, 100, 120).await.unwrap();
        let second = processor.compute_single(PAIR_A, 100, 120).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_gap_in_chain_data_is_a_defect() {
        let chain = MockChain::new()
            .with_pair(PAIR_A, 100..=110)
            .without_block(PAIR_A, 103);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain));

        let err = processor.compute_single(PAIR_A, 100, 105).await.unwrap_err();
        assert!(matches!(err, ComputeError::MissingBlock { block: 103, .. }));
    }

    #[tokio::test]
    async fn test_inverted_range_fails_before_fetching() {
        let chain = MockChain::new().failing(PAIR_A);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain));

        let err = processor.compute_single(PAIR_A, 105, 100).await.unwrap_err();
        assert!(matches!(err, ComputeError::InvalidRange { min: 105, max: 100 }));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let chain = MockChain::new().failing(PAIR_A);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain));

        let err = processor.compute_single(PAIR_A, 100, 102).await.unwrap_err();
        assert!(matches!(err, ComputeError::Rpc { .. }));
    }

    #[tokio::test]
    async fn test_transforms_run_in_order() {
        let chain = MockChain::new().with_pair(PAIR_A, 100..=101);
        let processor = PairTotalReservesProcessor::new(Arc::new(chain))
            .with_transform(Arc::new(|mut s: PairTotalReservesSnapshot| {
                s.contract = s.contract.to_uppercase();
                s
            }))
            .with_transform(Arc::new(|mut s: PairTotalReservesSnapshot| {
                s.contract.push_str("-checked");
                s
            }));

        let snapshot = processor.compute_single(PAIR_A, 100, 101).await.unwrap();
        assert_eq!(snapshot.contract, format!("{}-checked", PAIR_A.to_uppercase()));
    }
}
