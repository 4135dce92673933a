//! Upload configuration.
//!
//! Provides [`UploadConfig`] for configuring a single file-to-vault upload.
//! Ambient settings (region, endpoint, account, log level, default chunk
//! size) are loaded from environment variables; the command line fills in
//! the vault and file and may override the rest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{ConfigError, ConfigResult};
use crate::types::ChunkSize;
use crate::validation::{validate_description, validate_source_file, validate_vault_name};

/// Configuration for one upload invocation.
///
/// # Examples
///
/// ```
/// use coldpush_core::{ChunkSize, UploadConfig};
///
/// let config = UploadConfig::builder()
///     .vault("photos".into())
///     .file("/tmp/archive.tar".into())
///     .build();
/// assert_eq!(config.chunk_size, ChunkSize::DEFAULT);
/// assert_eq!(config.resolved_description(), "archive.tar");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /// Target vault name.
    pub vault: String,

    /// Source file to upload.
    pub file: PathBuf,

    /// Archive description; defaults to the file basename when unset.
    #[builder(default)]
    pub description: Option<String>,

    /// Multipart part size.
    #[builder(default)]
    pub chunk_size: ChunkSize,

    /// Verbose output (debug logging and service responses).
    #[builder(default = false)]
    pub verbose: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// AWS region override; the SDK default chain is used when unset.
    #[builder(default)]
    pub region: Option<String>,

    /// Endpoint override for Glacier-compatible services.
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// Owning account ID; looked up from the credentials when unset.
    #[builder(default)]
    pub account_id: Option<String>,

    /// Where to persist the resume checkpoint, if anywhere.
    #[builder(default)]
    pub checkpoint_path: Option<PathBuf>,

    /// Resume the upload recorded in the checkpoint.
    #[builder(default = false)]
    pub resume: bool,

    /// Run the protocol against the in-memory service instead of the network.
    #[builder(default = false)]
    pub dry_run: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            vault: String::new(),
            file: PathBuf::new(),
            description: None,
            chunk_size: ChunkSize::DEFAULT,
            verbose: false,
            log_level: String::from("info"),
            region: None,
            endpoint_url: None,
            account_id: None,
            checkpoint_path: None,
            resume: false,
            dry_run: false,
        }
    }
}

impl UploadConfig {
    /// Load ambient settings from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_REGION` / `DEFAULT_REGION` | SDK default chain |
    /// | `GLACIER_ENDPOINT_URL` | *(unset)* |
    /// | `GLACIER_ACCOUNT_ID` | *(looked up)* |
    /// | `COLDPUSH_CHUNK_SIZE` | `64MiB` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `COLDPUSH_CHUNK_SIZE` is not a valid
    /// chunk size.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load ambient settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("AWS_REGION").or_else(|| lookup("DEFAULT_REGION")) {
            config.region = Some(v);
        }
        if let Some(v) = lookup("GLACIER_ENDPOINT_URL") {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = lookup("GLACIER_ACCOUNT_ID") {
            config.account_id = Some(v);
        }
        if let Some(v) = lookup("COLDPUSH_CHUNK_SIZE") {
            config.chunk_size = ChunkSize::parse(&v).map_err(|e| ConfigError::Env {
                var: "COLDPUSH_CHUNK_SIZE",
                message: e.to_string(),
            })?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// The description sent to the service: the configured one, or the
    /// basename of the source file.
    #[must_use]
    pub fn resolved_description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| basename(&self.file))
    }

    /// The effective log filter, forced to `debug` in verbose mode.
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }

    /// Validate everything that can be checked locally.
    ///
    /// Returns the current size of the source file.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: vault name, description,
    /// then source file.
    pub fn validate(&self) -> ConfigResult<u64> {
        validate_vault_name(&self.vault)?;
        validate_description(&self.resolved_description())?;
        validate_source_file(&self.file)
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
