//! Validation for upload inputs.
//!
//! Provides validation functions for vault names, archive descriptions and
//! the source file, following the rules in the
//! [Amazon S3 Glacier documentation](https://docs.aws.amazon.com/amazonglacier/latest/dev/creating-vaults.html).
//! All checks run before the first network call.

use std::path::Path;

use crate::error::ConfigError;

/// Maximum vault name length in characters.
const MAX_VAULT_NAME_LEN: usize = 255;

/// Maximum archive description length in characters.
const MAX_DESCRIPTION_LEN: usize = 1024;

/// Validate a Glacier vault name.
///
/// Rules:
/// - 1-255 characters long
/// - Only `a-z`, `A-Z`, `0-9`, `_` (underscore), `-` (hyphen), and `.` (period)
///
/// # Errors
///
/// Returns [`ConfigError::InvalidVaultName`] if any rule is violated.
///
/// # Examples
///
/// ```
/// use coldpush_core::validation::validate_vault_name;
///
/// assert!(validate_vault_name("my-vault").is_ok());
/// assert!(validate_vault_name("my vault").is_err());
/// ```
pub fn validate_vault_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_VAULT_NAME_LEN {
        return Err(ConfigError::InvalidVaultName {
            name: name.to_owned(),
            reason: format!("Vault name must be between 1 and {MAX_VAULT_NAME_LEN} characters long"),
        });
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(ConfigError::InvalidVaultName {
            name: name.to_owned(),
            reason: "Vault name must only contain letters, numbers, underscores, hyphens, and periods"
                .to_owned(),
        });
    }

    Ok(())
}

/// Validate an archive description.
///
/// Rules:
/// - At most 1024 characters
/// - Only printable ASCII (`0x20`-`0x7E`)
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDescription`] if any rule is violated.
pub fn validate_description(description: &str) -> Result<(), ConfigError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ConfigError::InvalidDescription {
            reason: format!("description must be at most {MAX_DESCRIPTION_LEN} characters long"),
        });
    }

    if let Some(bad) = description.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(ConfigError::InvalidDescription {
            reason: format!("description contains non-printable or non-ASCII character {bad:?}"),
        });
    }

    Ok(())
}

/// Check that `path` names an existing regular file and return its size.
///
/// # Errors
///
/// Returns [`ConfigError::SourceFile`] if the file cannot be inspected and
/// [`ConfigError::NotAFile`] if it is a directory or another non-file entry.
pub fn validate_source_file(path: &Path) -> Result<u64, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::SourceFile {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(ConfigError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(metadata.len())
}
