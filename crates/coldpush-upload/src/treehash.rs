//! SHA-256 tree hash computation.
//!
//! The archive service verifies uploads with a hierarchical checksum: the
//! data is split into 1 MiB leaves, each leaf is hashed with SHA-256, and
//! adjacent digests are concatenated and hashed pairwise, level by level,
//! until a single root remains. A trailing digest without a partner is
//! carried up to the next level unchanged.
//!
//! # Streaming Hashing
//!
//! Files are never buffered whole. [`TreeHasher`] accepts data incrementally
//! (it also implements [`std::io::Write`], so `io::copy` can drive it) and
//! keeps only one digest per completed leaf.
//!
//! Because part sizes are always 1 MiB times a power of two, every full part
//! is a complete subtree, so [`combine`] over the part roots yields the same
//! value as hashing the whole file.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

use digest::Digest;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Size of a tree hash leaf: 1 MiB.
pub const LEAF_SIZE: usize = 1024 * 1024;

/// SHA-256 of the empty input, the root hash of an empty archive.
const EMPTY_SHA256: [u8; 32] = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

// ---------------------------------------------------------------------------
// TreeHash
// ---------------------------------------------------------------------------

/// A 32-byte tree hash digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreeHash([u8; 32]);

impl TreeHash {
    /// Root hash of zero bytes of input.
    pub const EMPTY: Self = Self(EMPTY_SHA256);

    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding, as sent in `x-amz-sha256-tree-hash`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_digest(hasher: Sha256) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }
}

impl fmt::Display for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeHash({})", self.to_hex())
    }
}

/// Error returned when parsing a [`TreeHash`] from hex fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid tree hash {0:?}: expected 64 hex characters")]
pub struct ParseTreeHashError(String);

impl FromStr for TreeHash {
    type Err = ParseTreeHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| ParseTreeHashError(s.to_owned()))?;
        Ok(Self(out))
    }
}

impl TryFrom<String> for TreeHash {
    type Error = ParseTreeHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TreeHash> for String {
    fn from(value: TreeHash) -> Self {
        value.to_hex()
    }
}

// ---------------------------------------------------------------------------
// TreeHasher
// ---------------------------------------------------------------------------

/// Incremental tree hash over a byte stream.
#[derive(Debug, Clone, Default)]
pub struct TreeHasher {
    leaves: Vec<TreeHash>,
    current: Sha256,
    filled: usize,
}

impl TreeHasher {
    /// Create an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (LEAF_SIZE - self.filled).min(data.len());
            let (head, rest) = data.split_at(take);
            self.current.update(head);
            self.filled += take;
            data = rest;

            if self.filled == LEAF_SIZE {
                self.seal_leaf();
            }
        }
    }

    /// Consume the hasher and return the root.
    #[must_use]
    pub fn finish(mut self) -> TreeHash {
        // An empty stream still contributes one (empty) leaf.
        if self.filled > 0 || self.leaves.is_empty() {
            self.seal_leaf();
        }
        combine(&self.leaves)
    }

    fn seal_leaf(&mut self) {
        let leaf = std::mem::take(&mut self.current);
        self.leaves.push(TreeHash::from_digest(leaf));
        self.filled = 0;
    }
}

impl Write for TreeHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Standalone functions
// ---------------------------------------------------------------------------

/// Reduce a sequence of digests to their tree root.
///
/// Returns [`TreeHash::EMPTY`] for an empty slice, so combining the part
/// hashes of a zero-part upload agrees with hashing an empty file.
///
/// # Examples
///
/// ```
/// use coldpush_upload::treehash::{combine, tree_hash};
///
/// let leaf = tree_hash(b"hello");
/// assert_eq!(combine(&[leaf]), leaf);
/// ```
#[must_use]
pub fn combine(hashes: &[TreeHash]) -> TreeHash {
    if hashes.is_empty() {
        return TreeHash::EMPTY;
    }

    let mut level = hashes.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                if let [left, right] = pair {
                    let mut hasher = Sha256::new();
                    hasher.update(left.as_bytes());
                    hasher.update(right.as_bytes());
                    TreeHash::from_digest(hasher)
                } else {
                    pair[0]
                }
            })
            .collect();
    }
    level[0]
}

/// Compute the tree hash of an in-memory buffer.
#[must_use]
pub fn tree_hash(data: &[u8]) -> TreeHash {
    let mut hasher = TreeHasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Compute the tree hash of everything readable from `reader`.
pub fn tree_hash_reader<R: Read>(mut reader: R) -> io::Result<TreeHash> {
    let mut hasher = TreeHasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finish())
}

/// Compute the tree hash of a file through a freshly opened handle.
///
/// The handle is closed before this function returns, on every path.
pub fn tree_hash_file(path: &Path) -> io::Result<TreeHash> {
    let file = File::open(path)?;
    tree_hash_reader(BufReader::with_capacity(LEAF_SIZE, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward reference: hash all leaves, then reduce pairwise.
    fn reference_tree_hash(data: &[u8]) -> TreeHash {
        if data.is_empty() {
            return TreeHash::from_digest(Sha256::new());
        }
        let mut level: Vec<[u8; 32]> = data
            .chunks(LEAF_SIZE)
            .map(|leaf| {
                let mut out = [0u8; 32];
                out.copy_from_slice(&Sha256::digest(leaf));
                out
            })
            .collect();
        while level.len() > 1 {
            let mut next = Vec::new();
            for pair in level.chunks(2) {
                if pair.len() == 2 {
                    let mut joined = Vec::with_capacity(64);
                    joined.extend_from_slice(&pair[0]);
                    joined.extend_from_slice(&pair[1]);
                    let mut out = [0u8; 32];
                    out.copy_from_slice(&Sha256::digest(&joined));
                    next.push(out);
                } else {
                    next.push(pair[0]);
                }
            }
            level = next;
        }
        TreeHash::from_bytes(level[0])
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_should_hash_empty_input_as_sha256_of_nothing() {
        assert_eq!(
            tree_hash(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(TreeHasher::new().finish(), TreeHash::EMPTY);
    }

    #[test]
    fn test_should_equal_plain_sha256_for_single_leaf() {
        assert_eq!(
            tree_hash(b"hello").to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        let data = patterned(LEAF_SIZE);
        assert_eq!(tree_hash(&data), reference_tree_hash(&data));
    }

    #[test]
    fn test_should_match_reference_for_multi_leaf_inputs() {
        for len in [LEAF_SIZE + 1, 2 * LEAF_SIZE, 3 * LEAF_SIZE, 5 * LEAF_SIZE + 17] {
            let data = patterned(len);
            assert_eq!(tree_hash(&data), reference_tree_hash(&data), "len {len}");
        }
    }

    #[test]
    fn test_should_match_single_shot_and_streaming_results() {
        let data = patterned(3 * LEAF_SIZE + 100);
        let mut hasher = TreeHasher::new();
        for piece in data.chunks(7919) {
            hasher.update(piece);
        }
        assert_eq!(hasher.finish(), tree_hash(&data));
    }

    #[test]
    fn test_should_be_deterministic() {
        let data = patterned(2 * LEAF_SIZE + 3);
        assert_eq!(tree_hash(&data), tree_hash(&data));
    }

    #[test]
    fn test_should_compose_part_roots_into_file_root() {
        // Two-leaf parts, three parts with a short tail.
        let part_len = 2 * LEAF_SIZE;
        let data = patterned(2 * part_len + LEAF_SIZE / 2);
        let parts: Vec<TreeHash> = data.chunks(part_len).map(tree_hash).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(combine(&parts), tree_hash(&data));
    }

    #[test]
    fn test_should_combine_empty_slice_to_empty_root() {
        assert_eq!(combine(&[]), TreeHash::EMPTY);
    }

    #[test]
    fn test_should_hash_file_through_fresh_handle() {
        let dir = tempfile::tempdir().expect("test tempdir");
        let path = dir.path().join("data.bin");
        let data = patterned(LEAF_SIZE + 4096);
        std::fs::write(&path, &data).expect("test write");

        assert_eq!(tree_hash_file(&path).unwrap(), tree_hash(&data));
    }

    #[test]
    fn test_should_round_trip_hex() {
        let hash = tree_hash(b"round trip");
        let parsed: TreeHash = hash.to_hex().parse().expect("test parse");
        assert_eq!(parsed, hash);
        assert!("zz".parse::<TreeHash>().is_err());
        assert!("abcd".parse::<TreeHash>().is_err());
    }

    #[test]
    fn test_should_serialize_as_hex_string() {
        let json = serde_json::to_string(&TreeHash::EMPTY).expect("test serialization");
        assert_eq!(
            json,
            "\"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\""
        );
    }
}
