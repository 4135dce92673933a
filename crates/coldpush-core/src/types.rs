//! Common type definitions shared across crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_vault_name;

/// One mebibyte in bytes.
pub const MIB: u64 = 1_048_576;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// AWS Account ID (12-digit string), or `-` for the caller's own account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Placeholder accepted by Glacier for "the account owning the credentials".
    pub const CURRENT: &str = "-";

    /// Create a new account ID from a string.
    ///
    /// # Errors
    /// Returns an error if the account ID is neither `-` nor a 12-digit
    /// numeric string.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id == Self::CURRENT {
            return Ok(Self(id));
        }
        if id.len() != 12 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidAccountId(id));
        }
        Ok(Self(id))
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(Self::CURRENT.to_owned())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// VaultName
// ---------------------------------------------------------------------------

/// A validated Glacier vault name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaultName(String);

impl VaultName {
    /// Create a vault name, enforcing the service naming rules.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidVaultName`] if the name is rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_vault_name(&name)?;
        Ok(Self(name))
    }

    /// Get the vault name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VaultName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VaultName> for String {
    fn from(value: VaultName) -> Self {
        value.0
    }
}

impl fmt::Display for VaultName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ChunkSize
// ---------------------------------------------------------------------------

/// Multipart part size in bytes.
///
/// Always 1 MiB multiplied by a power of two, between 1 MiB and 4 GiB
/// inclusive.
///
/// # Examples
///
/// ```
/// use coldpush_core::{ChunkSize, MIB};
///
/// assert_eq!(ChunkSize::default().get(), 64 * MIB);
/// assert!(ChunkSize::new(16 * MIB).is_ok());
/// assert!(ChunkSize::new(3 * MIB).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ChunkSize(u64);

impl ChunkSize {
    /// Smallest part size accepted by the service: 1 MiB.
    pub const MIN: Self = Self(MIB);

    /// Largest part size accepted by the service: 4 GiB.
    pub const MAX: Self = Self(4096 * MIB);

    /// Part size used when none is configured: 64 MiB.
    pub const DEFAULT: Self = Self(64 * MIB);

    /// Validate a part size in bytes.
    ///
    /// # Errors
    /// Returns [`ConfigError::ChunkSizeOutOfRange`] outside [1 MiB, 4 GiB] and
    /// [`ConfigError::ChunkSizeNotPowerOfTwo`] for sizes that are not
    /// 1 MiB times a power of two.
    pub fn new(bytes: u64) -> Result<Self, ConfigError> {
        if !(Self::MIN.0..=Self::MAX.0).contains(&bytes) {
            return Err(ConfigError::ChunkSizeOutOfRange { bytes });
        }
        if bytes % MIB != 0 || !(bytes / MIB).is_power_of_two() {
            return Err(ConfigError::ChunkSizeNotPowerOfTwo { bytes });
        }
        Ok(Self(bytes))
    }

    /// Parse and validate a human-readable size such as `"64MiB"` or `"4MB"`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSize`] for unparseable input and the
    /// errors of [`ChunkSize::new`] for sizes the service rejects.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Self::new(crate::size::parse_size(input)?)
    }

    /// Size in bytes.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Size in whole mebibytes.
    #[must_use]
    pub const fn megabytes(self) -> u64 {
        self.0 / MIB
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u64> for ChunkSize {
    type Error = ConfigError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChunkSize> for u64 {
    fn from(value: ChunkSize) -> Self {
        value.0
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MiB", self.megabytes())
    }
}
