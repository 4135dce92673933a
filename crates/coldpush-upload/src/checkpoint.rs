//! Resume checkpoints.
//!
//! A [`Checkpoint`] records the open upload session and every part the
//! service has acknowledged so far. [`CheckpointStore`] persists it as JSON
//! next to its final location and atomically renames it into place after
//! each acknowledged part, so a crashed run can continue the same session
//! without re-uploading acknowledged bytes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::job::UploadJob;
use crate::service::UploadSession;
use crate::table::ChecksumTable;

/// Current on-disk checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to read, write or apply a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The checkpoint file could not be read or written.
    #[error("checkpoint {path}: {source}")]
    Io {
        /// Checkpoint path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The checkpoint file is not valid checkpoint JSON.
    #[error("checkpoint {path} is corrupt: {source}")]
    Json {
        /// Checkpoint path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint was written by an incompatible version.
    #[error("checkpoint {path} has unsupported version {version}")]
    UnsupportedVersion {
        /// Checkpoint path.
        path: PathBuf,
        /// Version found in the file.
        version: u32,
    },

    /// Resuming was requested but no checkpoint exists.
    #[error("no checkpoint to resume from at {path}")]
    Missing {
        /// Checkpoint path.
        path: PathBuf,
    },

    /// The checkpoint belongs to a different upload.
    #[error("checkpoint was recorded for {field} {found}, but this upload uses {expected}")]
    Mismatch {
        /// Which setting differs.
        field: &'static str,
        /// Value for the current upload.
        expected: String,
        /// Value recorded in the checkpoint.
        found: String,
    },
}

impl CheckpointError {
    /// Whether the error stems from how the tool was invoked rather than
    /// from a failing disk.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::Mismatch { .. })
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Persisted progress of one multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Format version.
    pub version: u32,
    /// The open session.
    pub session: UploadSession,
    /// Source file being uploaded.
    pub source: PathBuf,
    /// Acknowledged part checksums by chunk index.
    pub parts: ChecksumTable,
    /// When the checkpoint was last written.
    pub updated: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot the given session and acknowledged parts.
    #[must_use]
    pub fn new(session: UploadSession, source: PathBuf, parts: ChecksumTable) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            session,
            source,
            parts,
            updated: Utc::now(),
        }
    }

    /// Check that this checkpoint can continue `job`.
    ///
    /// The vault and part size must match what the session was opened
    /// with. The source path must match as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Mismatch`] naming the first differing field.
    pub fn ensure_matches(&self, job: &UploadJob) -> Result<(), CheckpointError> {
        if &self.session.vault != job.vault() {
            return Err(mismatch("vault", job.vault(), &self.session.vault));
        }
        if self.session.part_size != job.chunk_size() {
            return Err(mismatch(
                "chunk size",
                job.chunk_size(),
                self.session.part_size,
            ));
        }
        if self.source != job.path() {
            return Err(mismatch(
                "file",
                job.path().display(),
                self.source.display(),
            ));
        }
        Ok(())
    }
}

fn mismatch(
    field: &'static str,
    expected: impl std::fmt::Display,
    found: impl std::fmt::Display,
) -> CheckpointError {
    CheckpointError::Mismatch {
        field,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

/// A checkpoint file at a fixed path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store for the checkpoint at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the file exists but cannot be read,
    /// parsed, or has an unsupported version.
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&raw).map_err(|source| CheckpointError::Json {
                path: self.path.clone(),
                source,
            })?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                path: self.path.clone(),
                version: checkpoint.version,
            });
        }

        Ok(Some(checkpoint))
    }

    /// Load the checkpoint, failing if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Missing`] when no checkpoint exists, or
    /// any error from [`load`](Self::load).
    pub fn load_existing(&self) -> Result<Checkpoint, CheckpointError> {
        self.load()?.ok_or_else(|| CheckpointError::Missing {
            path: self.path.clone(),
        })
    }

    /// Atomically replace the checkpoint with `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file cannot be written.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        serde_json::to_writer_pretty(&mut tmp, checkpoint).map_err(|source| {
            CheckpointError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        debug!(path = %self.path.display(), parts = checkpoint.parts.len(), "checkpoint saved");
        Ok(())
    }

    /// Delete the checkpoint. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
