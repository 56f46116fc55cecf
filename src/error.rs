use thiserror::Error;

/// Failure of a single snapshot computation.
///
/// The fan-out runner inspects the variant to decide how loudly a dropped
/// source is reported; the aggregator propagates every variant it sees.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Chain call failed after the RPC layer exhausted its retries.
    #[error("rpc call failed for {source_address}: {error:#}")]
    Rpc {
        source_address: String,
        error: anyhow::Error,
    },

    /// Bulk fetch returned nothing usable for the source.
    #[error("no data returned for {0}")]
    NoData(String),

    /// Bulk fetch skipped a block inside the requested range.
    #[error("missing block {block} in series for {source_address}")]
    MissingBlock { source_address: String, block: u64 },

    #[error("invalid block range: max chain height {max} < min chain height {min}")]
    InvalidRange { min: u64, max: u64 },

    #[error("epoch [{begin}, {end}] spans more than one block, processor supports a single block height")]
    SingleBlockRequired { begin: u64, end: u64 },

    #[error("malformed snapshot data: {0}")]
    Malformed(String),

    #[error("failed to decode snapshot payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("snapshot storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("tail epoch resolution failed: {0:#}")]
    Resolver(anyhow::Error),
}

impl ComputeError {
    pub fn rpc(source_address: impl Into<String>, error: impl Into<anyhow::Error>) -> Self {
        Self::Rpc {
            source_address: source_address.into(),
            error: error.into(),
        }
    }

    /// Errors that may succeed on a later epoch without any upstream fix.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Rpc { .. } | Self::NoData(_) | Self::MissingBlock { .. } | Self::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ComputeError::rpc("0xabc", anyhow::anyhow!("timeout")).is_transient());
        assert!(ComputeError::NoData("0xabc".into()).is_transient());
        assert!(!ComputeError::Malformed("bad".into()).is_transient());
        assert!(!ComputeError::InvalidRange { min: 10, max: 9 }.is_transient());
    }

    #[test]
    fn test_invalid_range_message() {
        let err = ComputeError::InvalidRange { min: 10, max: 9 };
        assert_eq!(
            err.to_string(),
            "invalid block range: max chain height 9 < min chain height 10"
        );
    }
}
