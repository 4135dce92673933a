//! Upload error types.
//!
//! Three layers:
//!
//! - [`ServiceError`]: what an [`ArchiveService`](crate::ArchiveService)
//!   reports for a single remote call.
//! - [`IntegrityError`]: local checks that found the bytes, sizes or hashes
//!   inconsistent. These indicate a correctness problem, never a
//!   connectivity problem.
//! - [`UploadError`]: the top-level failure of a run, tagged with the phase
//!   in which it happened.

use coldpush_core::ConfigError;

use crate::checkpoint::CheckpointError;
use crate::driver::UploadState;
use crate::range::ByteRange;
use crate::treehash::TreeHash;

/// Failure reported by the remote archive service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The credentials were missing, invalid or not authorized.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An account or service limit was reached.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// The vault (or upload) does not exist or cannot be used.
    #[error("invalid vault: {0}")]
    InvalidContainer(String),

    /// The request did not complete: network failure, timeout, throttling
    /// or an unclassified service error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The part's byte range was rejected for this upload.
    #[error("range conflict: {0}")]
    RangeConflict(String),

    /// The service computed a different tree hash from the bytes it received.
    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// The declared archive size disagrees with the uploaded parts.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),
}

impl ServiceError {
    /// Whether this error means the service rejected the data itself.
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::ChecksumMismatch(_) | Self::SizeMismatch(_))
    }
}

/// A local consistency check failed.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// The file size at finalize time differs from the bytes submitted.
    #[error("file size does not match the bytes uploaded: measured {measured} bytes, submitted {submitted} bytes")]
    SizeMismatch {
        /// Size measured from file metadata at finalize time.
        measured: u64,
        /// Sum of all submitted part lengths.
        submitted: u64,
    },

    /// The file size differs from the size observed before the upload began.
    #[error("file size changed during upload: {expected} bytes at start, {measured} bytes now")]
    FileSizeChanged {
        /// Size observed during validation.
        expected: u64,
        /// Size measured from file metadata at finalize time.
        measured: u64,
    },

    /// The service acknowledged a part with a different checksum than the
    /// one computed locally.
    #[error("part {index} acknowledged with checksum {remote}, expected {local}")]
    PartChecksumMismatch {
        /// Chunk index.
        index: u64,
        /// Locally computed part tree hash.
        local: TreeHash,
        /// Checksum returned by the service.
        remote: TreeHash,
    },

    /// The recomputed file tree hash disagrees with the acknowledged parts.
    #[error("file content changed during upload: parts compose to {composed}, file hashes to {computed}")]
    TreeHashMismatch {
        /// Root composed from the acknowledged part checksums.
        composed: TreeHash,
        /// Root recomputed from the file.
        computed: TreeHash,
    },

    /// A chunk recorded in the resume checkpoint no longer matches the file.
    #[error("chunk {index} changed since it was uploaded: recorded {recorded}, now {actual}")]
    CheckpointDiverged {
        /// Chunk index.
        index: u64,
        /// Checksum stored in the checkpoint.
        recorded: TreeHash,
        /// Checksum of the chunk as re-read now.
        actual: TreeHash,
    },

    /// The service rejected the final size or checksum.
    #[error("service rejected the archive: {0}")]
    Rejected(#[source] ServiceError),
}

/// Top-level upload failure.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Invalid configuration or source file; nothing was sent.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The upload session could not be initiated.
    #[error("failed to initiate multipart upload: {0}")]
    Session(#[source] ServiceError),

    /// A part upload failed. The remote session is left open.
    #[error("failed to upload chunk {index} ({range}): {source}")]
    Submission {
        /// Chunk index.
        index: u64,
        /// Chunk byte range.
        range: ByteRange,
        /// The service failure.
        #[source]
        source: ServiceError,
    },

    /// Sizes or checksums disagree.
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// Completing the upload failed for a reason other than integrity.
    #[error("failed to complete multipart upload: {0}")]
    Finalize(#[source] ServiceError),

    /// Reading the source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The resume checkpoint could not be used.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The driver was run from a state other than `Unstarted`.
    #[error("upload driver is {actual:?}, expected {expected:?}")]
    InvalidState {
        /// Required state.
        expected: UploadState,
        /// Actual state.
        actual: UploadState,
    },
}

impl UploadError {
    /// Process exit code for this error class.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 2 | configuration |
    /// | 3 | session |
    /// | 4 | submission |
    /// | 5 | integrity |
    /// | 1 | anything else |
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Checkpoint(e) if e.is_configuration() => 2,
            Self::Session(_) => 3,
            Self::Submission { .. } => 4,
            Self::Integrity(_) => 5,
            Self::Finalize(_) | Self::Io(_) | Self::Checkpoint(_) | Self::InvalidState { .. } => 1,
        }
    }
}
