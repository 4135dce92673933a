//! coldpush - upload large files to Amazon S3 Glacier.
//!
//! Splits a file into power-of-two-MiB chunks, uploads them as a Glacier
//! multipart upload, and completes the archive only after verifying that the
//! acknowledged part checksums compose to the file's SHA-256 tree hash.
//!
//! # Usage
//!
//! ```text
//! coldpush [OPTIONS] <VAULT> <FILE>
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_REGION` / `DEFAULT_REGION` | SDK default chain | Region |
//! | `GLACIER_ENDPOINT_URL` | *(unset)* | Endpoint override |
//! | `GLACIER_ACCOUNT_ID` | *(looked up)* | Account owning the vault |
//! | `COLDPUSH_CHUNK_SIZE` | `64MiB` | Default chunk size |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! # Exit Codes
//!
//! `0` success, `2` invalid arguments or configuration, `3` session could
//! not be opened, `4` a chunk failed to upload, `5` integrity check failed,
//! `130` interrupted, `1` anything else.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coldpush_core::{ConfigError, UploadConfig};
use coldpush_glacier::GlacierArchiveService;
use coldpush_upload::{
    ArchiveService, CheckpointStore, MemoryArchiveService, UploadDriver, UploadError, UploadJob,
    UploadReport,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code for configuration and argument errors.
const EXIT_CONFIGURATION: u8 = 2;

/// Exit code when interrupted by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the given log level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Combine environment settings with the command line.
fn load_config(args: CliArgs) -> Result<UploadConfig, ConfigError> {
    let env = UploadConfig::from_env()?;
    Ok(args.apply(env))
}

/// Run `job` against `service`.
async fn upload<S: ArchiveService>(
    service: S,
    job: UploadJob,
    config: &UploadConfig,
) -> Result<UploadReport, UploadError> {
    let mut driver = UploadDriver::new(service, job);
    if let Some(path) = &config.checkpoint_path {
        driver = driver.with_checkpoint(CheckpointStore::new(path), config.resume);
    }
    driver.run().await
}

/// Validate the job, pick the service and run the upload.
///
/// The job is built before any service is constructed, so configuration
/// errors are reported without touching the network.
async fn run(config: &UploadConfig) -> Result<UploadReport, UploadError> {
    let job = UploadJob::from_config(config)?;
    info!(
        vault = %job.vault(),
        file = %job.path().display(),
        size = job.file_size(),
        chunk_size = %job.chunk_size(),
        chunks = job.expected_chunks(),
        "starting upload"
    );
    if config.resume {
        if let Some(path) = &config.checkpoint_path {
            CheckpointStore::new(path)
                .load_existing()?
                .ensure_matches(&job)?;
        }
    }

    if config.dry_run {
        let service = Arc::new(MemoryArchiveService::with_vaults([config.vault.clone()]));
        let report = upload(service.clone(), job, config).await?;
        info!(
            archives = service.archives(&config.vault).len(),
            "dry run finished against in-memory vault"
        );
        return Ok(report);
    }

    let service = GlacierArchiveService::connect(config).await?;
    upload(service, job, config).await
}

fn print_report(report: &UploadReport, verbose: bool) {
    if verbose {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "failed to render report"),
        }
        return;
    }

    println!("Archive ID: {}", report.archive_id);
    println!("Checksum:   {}", report.tree_hash);
    println!("Size:       {} bytes in {} chunks", report.archive_size, report.chunks);
    if let Some(location) = &report.location {
        println!("Location:   {location}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coldpush: {e}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    if let Err(e) = init_tracing(config.effective_log_level()) {
        eprintln!("coldpush: {e:#}");
        return ExitCode::from(EXIT_CONFIGURATION);
    }

    info!(version = VERSION, dry_run = config.dry_run, "coldpush starting");

    let result = tokio::select! {
        result = run(&config) => result,
        _ = tokio::signal::ctrl_c() => {
            error!("interrupted; the multipart upload is left open");
            if let Some(path) = &config.checkpoint_path {
                eprintln!(
                    "coldpush: interrupted; resume with --checkpoint {} --resume",
                    path.display()
                );
            }
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match result {
        Ok(report) => {
            print_report(&report, config.verbose);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "upload failed");
            eprintln!("coldpush: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
