//! Upload driver.
//!
//! [`UploadDriver`] runs one file through the multipart protocol:
//!
//! ```text
//! Unstarted --initiate--> SessionOpen --all parts acknowledged--> ChunksSubmitted
//!     --complete--> Finalized
//! (any error) --> Failed
//! ```
//!
//! Parts are submitted strictly in order, one at a time. Before completing,
//! the driver checks that the file size still matches the bytes submitted
//! and that a tree hash recomputed from a fresh read of the file matches
//! the root composed from the acknowledged part checksums. A failed run
//! leaves the remote session open; with a checkpoint configured, a later
//! run can resume it.

use std::fs::File;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::chunk::{Chunk, ChunkReader};
use crate::error::{IntegrityError, UploadError};
use crate::job::UploadJob;
use crate::service::{ArchiveService, UploadSession};
use crate::table::ChecksumTable;
use crate::treehash::{TreeHash, tree_hash, tree_hash_file};

/// Lifecycle of an [`UploadDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadState {
    /// Nothing sent yet.
    Unstarted,
    /// A session is open and parts are being submitted.
    SessionOpen,
    /// Every chunk is acknowledged; finalization is pending.
    ChunksSubmitted,
    /// The archive was created.
    Finalized,
    /// The run stopped on an error.
    Failed,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    /// Identifier of the new archive.
    pub archive_id: String,
    /// Relative URI of the new archive, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Multipart upload identifier.
    pub upload_id: String,
    /// Archive size in bytes.
    pub archive_size: u64,
    /// Archive tree hash.
    pub tree_hash: TreeHash,
    /// Number of parts the archive consists of.
    pub chunks: u64,
    /// Parts taken from the checkpoint instead of being uploaded again.
    pub resumed_chunks: u64,
}

/// Drives one [`UploadJob`] against an [`ArchiveService`].
#[derive(Debug)]
pub struct UploadDriver<S> {
    service: S,
    job: UploadJob,
    state: UploadState,
    session: Option<UploadSession>,
    table: ChecksumTable,
    checkpoint: Option<CheckpointStore>,
    resume: bool,
    submitted_bytes: u64,
    resumed_chunks: u64,
}

impl<S: ArchiveService> UploadDriver<S> {
    /// Create a driver for `job`.
    pub fn new(service: S, job: UploadJob) -> Self {
        Self {
            service,
            job,
            state: UploadState::Unstarted,
            session: None,
            table: ChecksumTable::new(),
            checkpoint: None,
            resume: false,
            submitted_bytes: 0,
            resumed_chunks: 0,
        }
    }

    /// Persist progress to `store` after every acknowledged part.
    ///
    /// With `resume`, the session and acknowledged parts recorded in `store`
    /// are picked up instead of initiating a new session.
    #[must_use]
    pub fn with_checkpoint(mut self, store: CheckpointStore, resume: bool) -> Self {
        self.checkpoint = Some(store);
        self.resume = resume;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// The open session, once initiated.
    #[must_use]
    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    /// Part checksums acknowledged so far.
    #[must_use]
    pub fn checksums(&self) -> &ChecksumTable {
        &self.table
    }

    /// The job being uploaded.
    #[must_use]
    pub fn job(&self) -> &UploadJob {
        &self.job
    }

    /// Upload the file and finalize the archive.
    ///
    /// A driver runs once. On failure it moves to [`UploadState::Failed`]
    /// and the remote session, if any, is left open.
    ///
    /// # Errors
    ///
    /// - [`UploadError::InvalidState`] if the driver already ran.
    /// - [`UploadError::Session`] if initiation failed.
    /// - [`UploadError::Submission`] if a part upload failed.
    /// - [`UploadError::Integrity`] if sizes or checksums disagree.
    /// - [`UploadError::Finalize`] if completion failed for another reason.
    /// - [`UploadError::Io`] or [`UploadError::Checkpoint`] on local I/O failure.
    pub async fn run(&mut self) -> Result<UploadReport, UploadError> {
        if self.state != UploadState::Unstarted {
            return Err(UploadError::InvalidState {
                expected: UploadState::Unstarted,
                actual: self.state,
            });
        }

        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(
                    state = ?self.state,
                    upload_id = self.session.as_ref().map(|s| s.upload_id.as_str()),
                    error = %e,
                    "upload failed"
                );
                self.state = UploadState::Failed;
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<UploadReport, UploadError> {
        let session = self.open_session().await?;
        self.submit_chunks(&session).await?;
        self.finalize(&session).await
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn open_session(&mut self) -> Result<UploadSession, UploadError> {
        let session = match (&self.checkpoint, self.resume) {
            (Some(store), true) => {
                let checkpoint = store.load_existing()?;
                checkpoint.ensure_matches(&self.job)?;
                info!(
                    upload_id = %checkpoint.session.upload_id,
                    acknowledged = checkpoint.parts.len(),
                    "resuming multipart upload"
                );
                self.table = checkpoint.parts;
                checkpoint.session
            }
            _ => {
                let session = self
                    .service
                    .initiate(
                        self.job.vault(),
                        self.job.description(),
                        self.job.chunk_size(),
                    )
                    .await
                    .map_err(UploadError::Session)?;
                info!(
                    vault = %session.vault,
                    upload_id = %session.upload_id,
                    part_size = %session.part_size,
                    "initiated multipart upload"
                );
                debug!(location = ?session.location, account_id = %session.account_id, "initiate response");
                session
            }
        };

        self.session = Some(session.clone());
        self.state = UploadState::SessionOpen;
        self.save_checkpoint(&session)?;
        Ok(session)
    }

    async fn submit_chunks(&mut self, session: &UploadSession) -> Result<(), UploadError> {
        let file = File::open(self.job.path())?;
        let total = self.job.expected_chunks();

        for chunk in ChunkReader::new(file, session.part_size) {
            let chunk = chunk?;
            let local = tree_hash(&chunk.data);

            if let Some(recorded) = self.table.get(chunk.index) {
                if recorded != local {
                    return Err(IntegrityError::CheckpointDiverged {
                        index: chunk.index,
                        recorded,
                        actual: local,
                    }
                    .into());
                }
                debug!(index = chunk.index, range = %chunk.range, "chunk already acknowledged, skipping");
                self.submitted_bytes += chunk.size();
                self.resumed_chunks += 1;
                continue;
            }

            let remote = self.submit(session, chunk.clone(), local).await?;
            self.table.insert(chunk.index, remote);
            self.submitted_bytes += chunk.size();
            self.save_checkpoint(session)?;

            info!(
                index = chunk.index,
                total,
                range = %chunk.range,
                checksum = %remote,
                "uploaded chunk"
            );
        }

        self.state = UploadState::ChunksSubmitted;
        Ok(())
    }

    async fn submit(
        &self,
        session: &UploadSession,
        chunk: Chunk,
        local: TreeHash,
    ) -> Result<TreeHash, UploadError> {
        let Chunk { index, range, data } = chunk;
        let remote = self
            .service
            .upload_part(session, range, data, local)
            .await
            .map_err(|source| UploadError::Submission {
                index,
                range,
                source,
            })?;

        debug!(index, range = %range, checksum = %remote, "upload_part response");

        if remote != local {
            return Err(IntegrityError::PartChecksumMismatch {
                index,
                local,
                remote,
            }
            .into());
        }
        Ok(remote)
    }

    async fn finalize(&mut self, session: &UploadSession) -> Result<UploadReport, UploadError> {
        let measured = std::fs::metadata(self.job.path())?.len();
        if measured != self.job.file_size() {
            return Err(IntegrityError::FileSizeChanged {
                expected: self.job.file_size(),
                measured,
            }
            .into());
        }
        if measured != self.submitted_bytes {
            return Err(IntegrityError::SizeMismatch {
                measured,
                submitted: self.submitted_bytes,
            }
            .into());
        }

        let computed = tree_hash_file(self.job.path())?;
        let composed = self.table.composed_root();
        if !self.table.is_contiguous() || composed != computed {
            return Err(IntegrityError::TreeHashMismatch { composed, computed }.into());
        }

        let receipt = self
            .service
            .complete(session, measured, computed)
            .await
            .map_err(|e| {
                if e.is_integrity() {
                    UploadError::Integrity(IntegrityError::Rejected(e))
                } else {
                    UploadError::Finalize(e)
                }
            })?;

        debug!(receipt = ?receipt, "complete response");
        if let Some(reported) = receipt.checksum {
            if reported != computed {
                warn!(reported = %reported, computed = %computed, "service reported a different archive checksum");
            }
        }

        self.state = UploadState::Finalized;
        if let Some(store) = &self.checkpoint {
            if let Err(e) = store.remove() {
                warn!(path = %store.path().display(), error = %e, "failed to remove checkpoint");
            }
        }

        info!(
            archive_id = %receipt.archive_id,
            size = measured,
            tree_hash = %computed,
            "archive created"
        );

        Ok(UploadReport {
            archive_id: receipt.archive_id,
            location: receipt.location,
            upload_id: session.upload_id.clone(),
            archive_size: measured,
            tree_hash: computed,
            chunks: self.table.len() as u64,
            resumed_chunks: self.resumed_chunks,
        })
    }

    fn save_checkpoint(&self, session: &UploadSession) -> Result<(), UploadError> {
        if let Some(store) = &self.checkpoint {
            let checkpoint = Checkpoint::new(
                session.clone(),
                self.job.path().to_owned(),
                self.table.clone(),
            );
            store.save(&checkpoint)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
