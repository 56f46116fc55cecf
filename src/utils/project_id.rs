//! Project and content identifiers.

use alloy::primitives::keccak256;

use super::hex_encode;

/// Kind of snapshot stream, first component of every project id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    PairTotalReserves,
    AssetTotals,
    WalletInteraction,
    AggregateMarketStats,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PairTotalReserves => "pairContract_total_reserves",
            Self::AssetTotals => "aave_poolContract_total_assets",
            Self::WalletInteraction => "tracking_wallet_interaction",
            Self::AggregateMarketStats => "aggregate_aave_market_stats",
        }
    }
}

/// Project id of a per-source stream: `{kind}:{source}:{namespace}`.
///
/// Source addresses are lowercased so checksummed and plain inputs map to the
/// same project.
pub fn project_id(kind: ProjectKind, source: &str, namespace: &str) -> String {
    format!("{}:{}:{}", kind.as_str(), source.to_lowercase(), namespace)
}

/// Project id of a cross-source aggregate stream: `{kind}:{namespace}`.
pub fn aggregate_project_id(kind: ProjectKind, namespace: &str) -> String {
    format!("{}:{}", kind.as_str(), namespace)
}

/// Content identifier of a stored payload: keccak256 of its bytes.
pub fn content_id(payload: &[u8]) -> String {
    hex_encode(keccak256(payload).as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_normalizes_address_case() {
        let checksummed = project_id(
            ProjectKind::PairTotalReserves,
            "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc",
            "mainnet",
        );
        let lower = project_id(
            ProjectKind::PairTotalReserves,
            "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc",
            "mainnet",
        );
        assert_eq!(checksummed, lower);
        assert_eq!(
            lower,
            "pairContract_total_reserves:0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc:mainnet"
        );
    }

    #[test]
    fn test_content_id_is_deterministic() {
        let a = content_id(br#"{"a":1}"#);
        let b = content_id(br#"{"a":1}"#);
        let c = content_id(br#"{"a":2}"#);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 66);
    }
}
