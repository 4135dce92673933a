//! Command-line parsing.

use std::path::PathBuf;

use clap::Parser;
use coldpush_core::{ChunkSize, UploadConfig};

/// Upload large files to Amazon S3 Glacier in verified multipart chunks.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[clap(name = "coldpush", version, about)]
pub struct CliArgs {
    /// Glacier vault to upload to
    pub vault: String,

    /// File to upload
    pub file: PathBuf,

    /// Verbose output (debug logging, service responses)
    #[clap(short, long)]
    pub verbose: bool,

    /// Archive description [default: file name]
    #[clap(short, long, value_name = "DESC")]
    pub description: Option<String>,

    /// Chunk size as number + unit, e.g. 4MB, 2GiB; must be 1 MiB times a
    /// power of two, at most 4 GiB [default: 64 MiB]
    #[clap(short = 's', long, value_name = "SIZE", value_parser = ChunkSize::parse)]
    pub chunk_size: Option<ChunkSize>,

    /// Record progress in PATH so the upload can be resumed
    #[clap(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Resume the upload recorded in --checkpoint
    #[clap(long, requires = "checkpoint")]
    pub resume: bool,

    /// Run the upload against an in-memory vault
    #[clap(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Layer these arguments over ambient settings loaded from the environment.
    pub fn apply(self, mut config: UploadConfig) -> UploadConfig {
        config.vault = self.vault;
        config.file = self.file;
        config.verbose |= self.verbose;
        if self.description.is_some() {
            config.description = self.description;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.checkpoint_path = self.checkpoint;
        config.resume = self.resume;
        config.dry_run = self.dry_run;
        config
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use coldpush_core::MIB;

    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("coldpush").chain(args.iter().copied()))
    }

    fn upload(args: &[&str]) -> CliArgs {
        parse(args).expect("test args")
    }

    fn kind(args: &[&str]) -> ErrorKind {
        parse(args).expect_err("test args should be rejected").kind()
    }

    #[test]
    fn test_should_parse_positional_arguments() {
        let args = upload(&["photos", "/data/photos.tar"]);
        assert_eq!(args.vault, "photos");
        assert_eq!(args.file, PathBuf::from("/data/photos.tar"));
        assert!(!args.verbose);
        assert!(args.description.is_none());
        assert!(args.chunk_size.is_none());
    }

    #[test]
    fn test_should_parse_short_options() {
        let args = upload(&["-v", "-d", "March photos", "-s", "4MB", "photos", "a.tar"]);
        assert!(args.verbose);
        assert_eq!(args.description.as_deref(), Some("March photos"));
        assert_eq!(args.chunk_size.map(ChunkSize::get), Some(4 * MIB));
    }

    #[test]
    fn test_should_parse_long_options_with_inline_values() {
        let args = upload(&[
            "photos",
            "--chunk-size=1GiB",
            "--description=backup",
            "a.tar",
            "--checkpoint",
            "/tmp/progress.json",
            "--resume",
            "--dry-run",
        ]);
        assert_eq!(args.chunk_size.map(ChunkSize::get), Some(1024 * MIB));
        assert_eq!(args.description.as_deref(), Some("backup"));
        assert_eq!(args.checkpoint, Some(PathBuf::from("/tmp/progress.json")));
        assert!(args.resume);
        assert!(args.dry_run);
    }

    #[test]
    fn test_should_treat_arguments_after_double_dash_as_positional() {
        let args = upload(&["--", "-vault-", "-file-"]);
        assert_eq!(args.vault, "-vault-");
        assert_eq!(args.file, PathBuf::from("-file-"));
    }

    #[test]
    fn test_should_return_help_and_version() {
        assert_eq!(kind(&["--help"]), ErrorKind::DisplayHelp);
        assert_eq!(kind(&["photos", "-h"]), ErrorKind::DisplayHelp);
        assert_eq!(kind(&["-V"]), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_should_reject_invalid_chunk_sizes() {
        for size in ["3MiB", "1048575", "lots", "8GiB"] {
            assert_eq!(kind(&["-s", size, "v", "f"]), ErrorKind::ValueValidation, "{size}");
        }
    }

    #[test]
    fn test_should_reject_malformed_command_lines() {
        assert_eq!(kind(&["photos"]), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind(&[]), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind(&["v", "f", "g"]), ErrorKind::UnknownArgument);
        assert_eq!(kind(&["--colour", "v", "f"]), ErrorKind::UnknownArgument);
        assert!(parse(&["v", "f", "-d"]).is_err());
        assert!(parse(&["--verbose=yes", "v", "f"]).is_err());
        assert_eq!(
            kind(&["--resume", "v", "f"]),
            ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_should_override_environment_settings() {
        let env = UploadConfig::builder()
            .vault(String::new())
            .file(PathBuf::new())
            .chunk_size(ChunkSize::new(16 * MIB).expect("test chunk size"))
            .region(Some("eu-west-1".into()))
            .build();

        let config = upload(&["-s", "2MiB", "photos", "a.tar"]).apply(env.clone());
        assert_eq!(config.vault, "photos");
        assert_eq!(config.chunk_size.get(), 2 * MIB);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));

        let config = upload(&["photos", "a.tar"]).apply(env);
        assert_eq!(config.chunk_size.get(), 16 * MIB, "env value kept when flag absent");
        assert_eq!(config.resolved_description(), "a.tar");
    }
}
