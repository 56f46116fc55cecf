use std::sync::Arc;

use log::{debug, error};

use super::{apply_transforms, SnapshotTransform};
use crate::chain::ChainDataSource;
use crate::error::ComputeError;
use crate::models::{Epoch, TxInteraction, WalletInteractionSnapshot};

/// Reports the transactions of one block that touch a tracked wallet.
///
/// Snapshots are keyed `"{from}_{to}"`, in the order the pair first appears
/// in the block.
pub struct WalletInteractionProcessor {
    chain: Arc<dyn ChainDataSource>,
    tracked_wallets: Vec<String>,
    transforms: Vec<SnapshotTransform<WalletInteractionSnapshot>>,
}

impl WalletInteractionProcessor {
    pub fn new(chain: Arc<dyn ChainDataSource>, tracked_wallets: &[String]) -> Self {
        Self {
            chain,
            tracked_wallets: tracked_wallets.iter().map(|w| w.to_lowercase()).collect(),
            transforms: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: SnapshotTransform<WalletInteractionSnapshot>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.tracked_wallets.is_empty()
    }

    fn tracked_party(&self, tx: &TxInteraction) -> Option<&str> {
        let from = tx.from.to_lowercase();
        let to = tx.to.as_deref().map(str::to_lowercase);

        self.tracked_wallets
            .iter()
            .find(|w| **w == from || to.as_deref() == Some(w.as_str()))
            .map(String::as_str)
    }

    pub async fn compute(
        &self,
        epoch: &Epoch,
    ) -> Result<Vec<(String, WalletInteractionSnapshot)>, ComputeError> {
        let block = epoch.require_single_block().inspect_err(|e| {
            error!("Wallet interaction epoch {} rejected: {}", epoch.epoch_id, e);
        })?;

        let txs = self.chain.block_interactions(block).await?;

        let mut snapshots: Vec<(String, WalletInteractionSnapshot)> = Vec::new();
        for tx in txs {
            let Some(wallet) = self.tracked_party(&tx) else {
                continue;
            };

            let key = format!("{}_{}", tx.from, tx.to.as_deref().unwrap_or("None"));
            match snapshots.iter_mut().find(|(k, _)| *k == key) {
                Some((_, snapshot)) => snapshot.transactions.push(tx),
                None => {
                    let snapshot = WalletInteractionSnapshot {
                        wallet_address: wallet.to_string(),
                        contract_address: tx.to.clone(),
                        transactions: vec![tx],
                    };
                    snapshots.push((key, snapshot));
                },
            }
        }

        debug!(
            "Found {} tracked wallet interactions in block {}",
            snapshots.len(),
            block
        );

        Ok(snapshots
            .into_iter()
            .map(|(key, snapshot)| (key, apply_transforms(&self.transforms, snapshot)))
            .collect())
    }
}
