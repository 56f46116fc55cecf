use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable per-block key used in every snapshot mapping.
pub fn block_key(block: u64) -> String {
    format!("block{block}")
}

/// Ordered mapping from `block{n}` to the metric value at that block.
///
/// Backed by a `BTreeMap` so serialization order never depends on insertion
/// order or hasher state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockSeries<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for BlockSeries<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> BlockSeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: u64, value: T) {
        self.entries.insert(block_key(block), value);
    }

    pub fn get(&self, block: u64) -> Option<&T> {
        self.entries.get(&block_key(block))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every block of `[begin, end]` has an entry and nothing else does.
    pub fn covers(&self, begin: u64, end: u64) -> bool {
        if end < begin {
            return self.is_empty();
        }
        self.len() as u64 == end - begin + 1 && (begin..=end).all(|b| self.get(b).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_block_prefixed() {
        let mut series = BlockSeries::new();
        series.insert(100, 1.5);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"block100":1.5}"#);
    }

    #[test]
    fn test_covers_detects_gaps() {
        let mut series = BlockSeries::new();
        series.insert(100, 1.0);
        series.insert(102, 1.0);
        assert!(!series.covers(100, 102));
        series.insert(101, 1.0);
        assert!(series.covers(100, 102));
        assert!(!series.covers(100, 103));
    }
}
