//! Sequential chunk producer.
//!
//! [`ChunkReader`] turns any [`Read`] source into a lazy, finite sequence of
//! [`Chunk`]s of a fixed size. It is pull-based: each call to `next` reads
//! at most one chunk. Once the source is exhausted, or a read fails, the
//! iterator is finished for good; a second pass needs a fresh reader over a
//! fresh handle.

use std::io::{self, Read};
use std::iter::FusedIterator;
use std::num::NonZeroU64;

use bytes::Bytes;
use coldpush_core::{ChunkSize, MIB};

use crate::range::ByteRange;

/// Upper bound on the buffer reserved before the first read of a chunk.
const INITIAL_CAPACITY: u64 = MIB;

/// A contiguous, non-empty slice of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based sequence index.
    pub index: u64,
    /// Inclusive byte range within the source file.
    pub range: ByteRange,
    /// Raw payload, exactly as read from the file.
    pub data: Bytes,
}

impl Chunk {
    /// Payload length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.range.size()
    }
}

/// Reads a source in fixed-size chunks.
///
/// Every chunk except possibly the last has exactly the configured size.
/// A chunk shorter than that size ends the sequence, and an empty source
/// yields no chunks at all.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU64;
/// use coldpush_upload::ChunkReader;
///
/// let data: &[u8] = b"AABBCCDDEE";
/// let chunks: Vec<_> = ChunkReader::with_len(data, NonZeroU64::new(4).unwrap())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[2].range.to_string(), "bytes 8-9/*");
/// ```
#[derive(Debug)]
pub struct ChunkReader<R> {
    reader: R,
    chunk_len: u64,
    offset: u64,
    index: u64,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader producing chunks of `chunk_size` bytes.
    pub fn new(reader: R, chunk_size: ChunkSize) -> Self {
        Self {
            reader,
            chunk_len: chunk_size.get(),
            offset: 0,
            index: 0,
            done: false,
        }
    }

    /// Create a reader with an arbitrary, unvalidated chunk length.
    pub fn with_len(reader: R, chunk_len: NonZeroU64) -> Self {
        Self {
            reader,
            chunk_len: chunk_len.get(),
            offset: 0,
            index: 0,
            done: false,
        }
    }

    /// Bytes consumed from the source so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fill one chunk, retrying short reads until the chunk is full or the
    /// source reports end of input.
    ///
    /// The buffer grows with the data actually read, so a short final chunk
    /// never holds a full chunk's worth of memory.
    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        let capacity = usize::try_from(self.chunk_len.min(INITIAL_CAPACITY)).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        (&mut self.reader)
            .take(self.chunk_len)
            .read_to_end(&mut buf)?;
        if buf.len() < buf.capacity() {
            buf.shrink_to_fit();
        }
        Ok(buf)
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let buf = match self.read_chunk() {
            Ok(buf) => buf,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let len = buf.len() as u64;
        if len < self.chunk_len {
            self.done = true;
        }

        let range = ByteRange::from_start_len(self.offset, len)?;
        let chunk = Chunk {
            index: self.index,
            range,
            data: Bytes::from(buf),
        };
        self.offset += len;
        self.index += 1;
        Some(Ok(chunk))
    }
}

impl<R: Read> FusedIterator for ChunkReader<R> {}
