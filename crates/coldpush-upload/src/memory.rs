//! In-memory archive service.
//!
//! [`MemoryArchiveService`] implements [`ArchiveService`] without a network.
//! It keeps vaults and in-progress uploads in memory and applies the same
//! checks the remote service applies: part ranges must be aligned to the
//! declared part size, each part's bytes must hash to the supplied
//! checksum, and completion requires contiguous parts covering exactly the
//! declared size with a matching tree hash. Payload bytes are hashed and
//! dropped; only per-part digests are retained.
//!
//! Used by the tests and by `--dry-run`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use coldpush_core::{AccountId, ChunkSize, VaultName};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::range::ByteRange;
use crate::service::{ArchiveReceipt, ArchiveService, UploadSession};
use crate::treehash::{TreeHash, combine, tree_hash};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// An archive assembled by a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArchive {
    /// Archive identifier.
    pub archive_id: String,
    /// Description given at initiation.
    pub description: String,
    /// Archive size in bytes.
    pub size: u64,
    /// Archive tree hash.
    pub checksum: TreeHash,
    /// Number of parts it was assembled from.
    pub parts: usize,
    /// When the upload completed.
    pub created: DateTime<Utc>,
}

/// A remote call observed by the service, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// `initiate` was called.
    Initiate {
        /// Target vault.
        vault: String,
        /// Archive description.
        description: String,
        /// Declared part size.
        part_size: ChunkSize,
    },
    /// `upload_part` was called.
    UploadPart {
        /// Upload identifier.
        upload_id: String,
        /// The part descriptor, e.g. `bytes 0-1048575/*`.
        range: String,
        /// Payload length.
        size: u64,
    },
    /// `complete` was called.
    Complete {
        /// Upload identifier.
        upload_id: String,
        /// Declared archive size.
        archive_size: u64,
        /// Declared tree hash.
        checksum: TreeHash,
    },
}

#[derive(Debug)]
struct MultipartUpload {
    vault: String,
    description: String,
    part_size: u64,
    /// Parts keyed by starting offset.
    parts: BTreeMap<u64, UploadPart>,
}

impl MultipartUpload {
    fn put_part(&mut self, part: UploadPart) {
        self.parts.insert(part.range.start(), part);
    }

    fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.range.size()).sum()
    }
}

#[derive(Debug, Clone)]
struct UploadPart {
    range: ByteRange,
    checksum: TreeHash,
}

// ---------------------------------------------------------------------------
// MemoryArchiveService
// ---------------------------------------------------------------------------

/// Archive service holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryArchiveService {
    account_id: AccountId,
    vaults: DashMap<String, Vec<StoredArchive>>,
    uploads: DashMap<String, MultipartUpload>,
    calls: Mutex<Vec<ServiceCall>>,
    failures: Mutex<HashMap<u64, ServiceError>>,
}

impl MemoryArchiveService {
    /// Create a service with no vaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with the given vaults already present.
    #[must_use]
    pub fn with_vaults<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let service = Self::new();
        for name in names {
            service.create_vault(name);
        }
        service
    }

    /// Create a vault if it does not exist yet.
    pub fn create_vault(&self, name: impl Into<String>) {
        self.vaults.entry(name.into()).or_default();
    }

    /// Make the next `upload_part` for the part starting at `offset` fail.
    pub fn fail_part_at(&self, offset: u64, error: ServiceError) {
        self.failures.lock().insert(offset, error);
    }

    /// Archives stored in `vault`, oldest first.
    #[must_use]
    pub fn archives(&self, vault: &str) -> Vec<StoredArchive> {
        self.vaults
            .get(vault)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of uploads initiated but neither completed nor abandoned.
    #[must_use]
    pub fn in_progress_uploads(&self) -> usize {
        self.uploads.len()
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// The part descriptors received so far, in order.
    #[must_use]
    pub fn part_ranges(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ServiceCall::UploadPart { range, .. } => Some(range.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ArchiveService for MemoryArchiveService {
    async fn initiate(
        &self,
        vault: &VaultName,
        description: &str,
        part_size: ChunkSize,
    ) -> Result<UploadSession, ServiceError> {
        self.record(ServiceCall::Initiate {
            vault: vault.to_string(),
            description: description.to_owned(),
            part_size,
        });

        if !self.vaults.contains_key(vault.as_str()) {
            return Err(ServiceError::InvalidContainer(format!(
                "Vault not found for ARN: {vault}"
            )));
        }

        let upload_id = Uuid::new_v4().simple().to_string();
        self.uploads.insert(
            upload_id.clone(),
            MultipartUpload {
                vault: vault.to_string(),
                description: description.to_owned(),
                part_size: part_size.get(),
                parts: BTreeMap::new(),
            },
        );

        debug!(vault = %vault, upload_id = %upload_id, "initiate_multipart_upload completed");

        Ok(UploadSession {
            location: Some(format!(
                "/{}/vaults/{vault}/multipart-uploads/{upload_id}",
                self.account_id
            )),
            upload_id,
            vault: vault.clone(),
            account_id: self.account_id.clone(),
            part_size,
        })
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        range: ByteRange,
        payload: Bytes,
        checksum: TreeHash,
    ) -> Result<TreeHash, ServiceError> {
        self.record(ServiceCall::UploadPart {
            upload_id: session.upload_id.clone(),
            range: range.to_string(),
            size: payload.len() as u64,
        });

        if let Some(error) = self.failures.lock().remove(&range.start()) {
            return Err(error);
        }

        let mut upload = self.uploads.get_mut(&session.upload_id).ok_or_else(|| {
            ServiceError::InvalidContainer(format!("no such upload: {}", session.upload_id))
        })?;

        if payload.len() as u64 != range.size() {
            return Err(ServiceError::RangeConflict(format!(
                "{range} declares {} bytes but the body has {}",
                range.size(),
                payload.len()
            )));
        }
        if range.start() % upload.part_size != 0 {
            return Err(ServiceError::RangeConflict(format!(
                "{range} does not start on a {}-byte part boundary",
                upload.part_size
            )));
        }
        if range.size() > upload.part_size {
            return Err(ServiceError::RangeConflict(format!(
                "{range} exceeds the {}-byte part size",
                upload.part_size
            )));
        }

        let actual = tree_hash(&payload);
        if actual != checksum {
            return Err(ServiceError::ChecksumMismatch(format!(
                "part {range}: declared {checksum}, received {actual}"
            )));
        }

        upload.put_part(UploadPart {
            range,
            checksum: actual,
        });

        debug!(upload_id = %session.upload_id, range = %range, "upload_part completed");

        Ok(actual)
    }

    async fn complete(
        &self,
        session: &UploadSession,
        archive_size: u64,
        checksum: TreeHash,
    ) -> Result<ArchiveReceipt, ServiceError> {
        self.record(ServiceCall::Complete {
            upload_id: session.upload_id.clone(),
            archive_size,
            checksum,
        });

        let upload = self.uploads.get(&session.upload_id).ok_or_else(|| {
            ServiceError::InvalidContainer(format!("no such upload: {}", session.upload_id))
        })?;

        if upload.total_size() != archive_size {
            return Err(ServiceError::SizeMismatch(format!(
                "declared {archive_size} bytes, parts cover {}",
                upload.total_size()
            )));
        }

        let mut expected_start = 0;
        for part in upload.parts.values() {
            if part.range.start() != expected_start {
                return Err(ServiceError::SizeMismatch(format!(
                    "missing bytes {expected_start}-{}",
                    part.range.start() - 1
                )));
            }
            let is_last = part.range.next_start() == archive_size;
            if !is_last && part.range.size() != upload.part_size {
                return Err(ServiceError::SizeMismatch(format!(
                    "non-final part {} is not {} bytes",
                    part.range, upload.part_size
                )));
            }
            expected_start = part.range.next_start();
        }

        let part_hashes: Vec<TreeHash> = upload.parts.values().map(|p| p.checksum).collect();
        let actual = combine(&part_hashes);
        if actual != checksum {
            return Err(ServiceError::ChecksumMismatch(format!(
                "declared {checksum}, parts compose to {actual}"
            )));
        }

        let archive = StoredArchive {
            archive_id: Uuid::new_v4().simple().to_string(),
            description: upload.description.clone(),
            size: archive_size,
            checksum: actual,
            parts: upload.parts.len(),
            created: Utc::now(),
        };
        let vault = upload.vault.clone();
        drop(upload);
        self.uploads.remove(&session.upload_id);

        let receipt = ArchiveReceipt {
            location: Some(format!(
                "/{}/vaults/{vault}/archives/{}",
                self.account_id, archive.archive_id
            )),
            archive_id: archive.archive_id.clone(),
            checksum: Some(actual),
        };
        self.vaults.entry(vault).or_default().push(archive);

        debug!(upload_id = %session.upload_id, archive_id = %receipt.archive_id, "complete_multipart_upload completed");

        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
