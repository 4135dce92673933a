//! A validated upload request.

use std::path::{Path, PathBuf};

use coldpush_core::{ChunkSize, ConfigError, UploadConfig, VaultName};

/// Everything the driver needs to know about one file-to-vault upload.
///
/// Built from an [`UploadConfig`] only after all local validation passed,
/// so a job always names an existing regular file, a valid vault and a
/// legal chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    path: PathBuf,
    vault: VaultName,
    description: String,
    chunk_size: ChunkSize,
    file_size: u64,
}

impl UploadJob {
    /// Validate `config` and build the job.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the vault name,
    /// description or source file.
    pub fn from_config(config: &UploadConfig) -> Result<Self, ConfigError> {
        let file_size = config.validate()?;
        Ok(Self {
            path: config.file.clone(),
            vault: VaultName::new(config.vault.clone())?,
            description: config.resolved_description(),
            chunk_size: config.chunk_size,
            file_size,
        })
    }

    /// Source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Target vault.
    #[must_use]
    pub fn vault(&self) -> &VaultName {
        &self.vault
    }

    /// Archive description sent at initiation.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Part size.
    #[must_use]
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// File size observed during validation.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of chunks a file of [`file_size`](Self::file_size) bytes splits into.
    #[must_use]
    pub fn expected_chunks(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size.get())
    }
}
