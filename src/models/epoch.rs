use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Inclusive block range released by the scheduler for one computation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub epoch_id: u64,
    pub begin: u64,
    pub end: u64,
}

impl Epoch {
    pub fn new(epoch_id: u64, begin: u64, end: u64) -> Self {
        Self {
            epoch_id,
            begin,
            end,
        }
    }

    /// Fails when the range is inverted.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.end < self.begin {
            return Err(ComputeError::InvalidRange {
                min: self.begin,
                max: self.end,
            });
        }
        Ok(())
    }

    /// Fails unless the epoch covers exactly one block.
    pub fn require_single_block(&self) -> Result<u64, ComputeError> {
        self.validate()?;
        if self.begin != self.end {
            return Err(ComputeError::SingleBlockRequired {
                begin: self.begin,
                end: self.end,
            });
        }
        Ok(self.begin)
    }

    /// Number of blocks in the range. Zero for an inverted range.
    pub fn block_count(&self) -> u64 {
        if self.end < self.begin {
            0
        } else {
            self.end - self.begin + 1
        }
    }
}

/// Block range stamped onto every source snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeightRange {
    pub begin: u64,
    pub end: u64,
}
