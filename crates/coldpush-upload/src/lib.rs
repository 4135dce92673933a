//! Chunked multipart upload driver for cold-storage vaults.
//!
//! This crate splits a file into range-addressed chunks, streams each chunk
//! to an [`ArchiveService`], records the checksum the service returns for
//! every part, and finalizes the upload with the file size and an
//! independently recomputed SHA-256 tree hash.
//!
//! # Architecture
//!
//! ```text
//! UploadDriver (state machine, integrity checks)
//!     |                 |                  |
//!     v                 v                  v
//! ChunkReader     ChecksumTable      ArchiveService
//! (file -> Chunk)  (index -> hash)   (Glacier / in-memory)
//!     |
//!     v
//! treehash (SHA-256 tree over 1 MiB leaves)
//! ```

pub mod checkpoint;
pub mod chunk;
pub mod driver;
pub mod error;
pub mod job;
pub mod memory;
pub mod range;
pub mod service;
pub mod table;
pub mod treehash;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use chunk::{Chunk, ChunkReader};
pub use driver::{UploadDriver, UploadReport, UploadState};
pub use error::{IntegrityError, ServiceError, UploadError};
pub use job::UploadJob;
pub use memory::MemoryArchiveService;
pub use range::ByteRange;
pub use service::{ArchiveReceipt, ArchiveService, UploadSession};
pub use table::ChecksumTable;
pub use treehash::{TreeHash, TreeHasher};
