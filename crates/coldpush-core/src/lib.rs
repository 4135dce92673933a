//! Core types, configuration, and validation for coldpush.
//!
//! This crate provides the building blocks shared by the upload driver, the
//! Glacier adapter and the command-line binary: the validated [`ChunkSize`],
//! vault and account identifiers, human-readable size parsing, and the
//! [`UploadConfig`] loaded from the environment and command line.

pub mod config;
mod error;
pub mod size;
mod types;
pub mod validation;

pub use config::UploadConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::{AccountId, ChunkSize, MIB, VaultName};
