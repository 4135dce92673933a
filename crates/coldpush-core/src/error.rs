//! Configuration error types for coldpush.

use std::path::PathBuf;

/// Error raised while building or validating an upload configuration.
///
/// Every variant is detected before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Chunk size is below 1 MiB or above 4 GiB.
    #[error("Illegal chunk size: must be between 1 MiB and 4 GiB ({bytes} b given)")]
    ChunkSizeOutOfRange {
        /// The rejected size in bytes.
        bytes: u64,
    },

    /// Chunk size is not 1 MiB multiplied by a power of two.
    #[error("Illegal chunk size: {bytes} b is not a megabyte multiplied by a power of 2")]
    ChunkSizeNotPowerOfTwo {
        /// The rejected size in bytes.
        bytes: u64,
    },

    /// A human-readable size string could not be parsed.
    #[error("invalid size {input:?}: {reason}")]
    InvalidSize {
        /// The string that failed to parse.
        input: String,
        /// Why it failed.
        reason: String,
    },

    /// The vault name violates the service naming rules.
    #[error("invalid vault name {name:?}: {reason}")]
    InvalidVaultName {
        /// The rejected vault name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The archive description violates the service rules.
    #[error("invalid archive description: {reason}")]
    InvalidDescription {
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be a 12-digit numeric string or '-')")]
    InvalidAccountId(String),

    /// The source file does not exist or cannot be inspected.
    #[error("cannot read source file {}: {source}", path.display())]
    SourceFile {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source path exists but is not a regular file.
    #[error("source path is not a regular file: {}", path.display())]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// An environment variable carried an unusable value.
    #[error("invalid value for {var}: {message}")]
    Env {
        /// The variable name.
        var: &'static str,
        /// Description of the problem.
        message: String,
    },
}

/// Convenience result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
