//! Inclusive byte ranges and their `Content-Range` rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-empty, inclusive byte range `[start, end]` within an archive.
///
/// Displays as the multipart part descriptor `bytes {start}-{end}/*`; the
/// total is left open because it is only known once the file has been
/// fully scanned.
///
/// # Examples
///
/// ```
/// use coldpush_upload::ByteRange;
///
/// let range = ByteRange::from_start_len(67_108_864, 67_108_864).unwrap();
/// assert_eq!(range.to_string(), "bytes 67108864-134217727/*");
/// assert_eq!(range.size(), 67_108_864);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Create a range from inclusive offsets. Returns `None` if `start > end`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// Create a range covering `len` bytes from `start`.
    ///
    /// Returns `None` for an empty range or on offset overflow.
    #[must_use]
    pub fn from_start_len(start: u64, len: u64) -> Option<Self> {
        let last = len.checked_sub(1)?;
        let end = start.checked_add(last)?;
        Some(Self { start, end })
    }

    /// First byte offset (inclusive).
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset (inclusive).
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered; always at least 1.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Offset of the first byte after this range.
    #[must_use]
    pub const fn next_start(&self) -> u64 {
        self.end + 1
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/*", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_render_content_range_descriptor() {
        let range = ByteRange::new(0, 67_108_863).unwrap();
        assert_eq!(range.to_string(), "bytes 0-67108863/*");
    }

    #[test]
    fn test_should_build_range_from_start_and_length() {
        let range = ByteRange::from_start_len(134_217_728, 23_068_672).unwrap();
        assert_eq!(range.start(), 134_217_728);
        assert_eq!(range.end(), 157_286_399);
        assert_eq!(range.size(), 23_068_672);
        assert_eq!(range.next_start(), 157_286_400);
    }

    #[test]
    fn test_should_accept_single_byte_range() {
        let range = ByteRange::new(5, 5).unwrap();
        assert_eq!(range.size(), 1);
        assert_eq!(range.to_string(), "bytes 5-5/*");
    }

    #[test]
    fn test_should_reject_inverted_or_empty_ranges() {
        assert!(ByteRange::new(10, 9).is_none());
        assert!(ByteRange::from_start_len(0, 0).is_none());
        assert!(ByteRange::from_start_len(u64::MAX, 2).is_none());
    }
}
