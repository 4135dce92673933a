//! The remote archive service seam.
//!
//! [`ArchiveService`] is the narrow interface the upload driver consumes:
//! initiate a multipart session, upload one part, complete the session.
//! Authentication, vault management and retry policy all live behind it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use coldpush_core::{AccountId, ChunkSize, VaultName};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::range::ByteRange;
use crate::treehash::TreeHash;

/// Server-side handle for an in-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Upload identifier issued by the service.
    pub upload_id: String,
    /// Vault the archive will land in.
    pub vault: VaultName,
    /// Account owning the vault.
    pub account_id: AccountId,
    /// Part size declared at initiation.
    pub part_size: ChunkSize,
    /// Relative URI of the upload resource, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReceipt {
    /// Identifier of the new archive.
    pub archive_id: String,
    /// Tree hash the service computed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<TreeHash>,
    /// Relative URI of the new archive, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A cold-storage service that accepts multipart uploads.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Start a multipart upload of parts sized `part_size` into `vault`.
    ///
    /// Fails with [`ServiceError::Authentication`], [`ServiceError::Quota`]
    /// or [`ServiceError::InvalidContainer`].
    async fn initiate(
        &self,
        vault: &VaultName,
        description: &str,
        part_size: ChunkSize,
    ) -> Result<UploadSession, ServiceError>;

    /// Upload one part covering `range`, whose tree hash is `checksum`.
    ///
    /// Returns the tree hash the service computed from the received bytes.
    /// Fails with [`ServiceError::Transport`] or
    /// [`ServiceError::RangeConflict`].
    async fn upload_part(
        &self,
        session: &UploadSession,
        range: ByteRange,
        payload: Bytes,
        checksum: TreeHash,
    ) -> Result<TreeHash, ServiceError>;

    /// Assemble the uploaded parts into an archive of `archive_size` bytes
    /// whose tree hash is `checksum`.
    ///
    /// Fails with [`ServiceError::ChecksumMismatch`] or
    /// [`ServiceError::SizeMismatch`].
    async fn complete(
        &self,
        session: &UploadSession,
        archive_size: u64,
        checksum: TreeHash,
    ) -> Result<ArchiveReceipt, ServiceError>;
}

#[async_trait]
impl<T: ArchiveService + ?Sized> ArchiveService for Arc<T> {
    async fn initiate(
        &self,
        vault: &VaultName,
        description: &str,
        part_size: ChunkSize,
    ) -> Result<UploadSession, ServiceError> {
        (**self).initiate(vault, description, part_size).await
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        range: ByteRange,
        payload: Bytes,
        checksum: TreeHash,
    ) -> Result<TreeHash, ServiceError> {
        (**self).upload_part(session, range, payload, checksum).await
    }

    async fn complete(
        &self,
        session: &UploadSession,
        archive_size: u64,
        checksum: TreeHash,
    ) -> Result<ArchiveReceipt, ServiceError> {
        (**self).complete(session, archive_size, checksum).await
    }
}
