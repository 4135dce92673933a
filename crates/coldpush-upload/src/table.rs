//! Per-part checksum bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::treehash::{TreeHash, combine};

/// Checksums acknowledged by the service, keyed by chunk sequence index.
///
/// Re-recording an index replaces its entry, so a resubmitted chunk never
/// produces a duplicate. Iteration is always in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumTable {
    parts: BTreeMap<u64, TreeHash>,
}

impl ChecksumTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the checksum for `index`, returning the previous one if any.
    pub fn insert(&mut self, index: u64, checksum: TreeHash) -> Option<TreeHash> {
        self.parts.insert(index, checksum)
    }

    /// Checksum recorded for `index`.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<TreeHash> {
        self.parts.get(&index).copied()
    }

    /// Number of recorded parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no part has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterate `(index, checksum)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, TreeHash)> + '_ {
        self.parts.iter().map(|(index, hash)| (*index, *hash))
    }

    /// Whether the recorded indices are exactly `0..len`.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.parts.keys().copied().eq(0..self.parts.len() as u64)
    }

    /// Tree root composed from the part checksums in index order.
    ///
    /// Only meaningful when [`is_contiguous`](Self::is_contiguous) holds.
    #[must_use]
    pub fn composed_root(&self) -> TreeHash {
        let hashes: Vec<TreeHash> = self.parts.values().copied().collect();
        combine(&hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::treehash::tree_hash;

    #[test]
    fn test_should_key_by_sequence_index() {
        let mut table = ChecksumTable::new();
        table.insert(1, tree_hash(b"second"));
        table.insert(0, tree_hash(b"first"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some(tree_hash(b"first")));
        assert_eq!(table.get(1), Some(tree_hash(b"second")));
        assert!(table.get(2).is_none());

        let indices: Vec<u64> = table.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_should_replace_resubmitted_part() {
        let mut table = ChecksumTable::new();
        assert!(table.insert(0, tree_hash(b"old")).is_none());
        assert_eq!(table.insert(0, tree_hash(b"new")), Some(tree_hash(b"old")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), Some(tree_hash(b"new")));
    }

    #[test]
    fn test_should_detect_gaps() {
        let mut table = ChecksumTable::new();
        assert!(table.is_contiguous());
        table.insert(0, tree_hash(b"a"));
        table.insert(2, tree_hash(b"c"));
        assert!(!table.is_contiguous());
        table.insert(1, tree_hash(b"b"));
        assert!(table.is_contiguous());
    }

    #[test]
    fn test_should_compose_root_in_index_order() {
        let mut table = ChecksumTable::new();
        let (a, b, c) = (tree_hash(b"a"), tree_hash(b"b"), tree_hash(b"c"));
        table.insert(2, c);
        table.insert(0, a);
        table.insert(1, b);
        assert_eq!(table.composed_root(), combine(&[a, b, c]));
        assert_eq!(ChecksumTable::new().composed_root(), TreeHash::EMPTY);
    }

    #[test]
    fn test_should_serialize_as_index_map() {
        let mut table = ChecksumTable::new();
        table.insert(3, TreeHash::EMPTY);
        let json = serde_json::to_string(&table).expect("test serialization");
        assert!(json.starts_with("{\"3\":\"e3b0c442"));
        let back: ChecksumTable = serde_json::from_str(&json).expect("test deserialize");
        assert_eq!(back, table);
    }
}
