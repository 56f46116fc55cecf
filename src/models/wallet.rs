use serde::{Deserialize, Serialize};

/// One transaction receipt touching a tracked wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInteraction {
    pub tx_hash: String,
    pub from: String,
    pub to: Option<String>,
    pub block_number: u64,
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInteractionSnapshot {
    pub wallet_address: String,
    pub contract_address: Option<String>,
    pub transactions: Vec<TxInteraction>,
}
