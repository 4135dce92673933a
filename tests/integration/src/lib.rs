//! Integration tests for coldpush against a Glacier-compatible endpoint.
//!
//! These tests require a running server at `localhost:4566` (or
//! `GLACIER_ENDPOINT_URL`). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p coldpush-integration -- --ignored
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;

use aws_credential_types::Credentials;
use aws_sdk_glacier::config::{BehaviorVersion, Region};
use coldpush_core::AccountId;
use coldpush_glacier::GlacierArchiveService;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("GLACIER_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a configured Glacier client pointing at the local server.
#[must_use]
pub fn glacier_client() -> aws_sdk_glacier::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_glacier::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .build();

    aws_sdk_glacier::Client::from_conf(config)
}

/// Archive service wrapping [`glacier_client`], acting for the caller's account.
#[must_use]
pub fn glacier_service() -> GlacierArchiveService {
    GlacierArchiveService::new(glacier_client(), AccountId::default())
}

/// Generate a unique vault name for a test.
#[must_use]
pub fn test_vault_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a vault and return its name. Caller is responsible for cleanup.
pub async fn create_test_vault(client: &aws_sdk_glacier::Client, prefix: &str) -> String {
    let name = test_vault_name(prefix);
    client
        .create_vault()
        .account_id(AccountId::CURRENT)
        .vault_name(&name)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create vault {name}: {e}"));
    name
}

/// Abort in-progress uploads, delete archives where possible, then delete
/// the vault.
pub async fn cleanup_vault(client: &aws_sdk_glacier::Client, vault: &str) {
    if let Ok(uploads) = client
        .list_multipart_uploads()
        .account_id(AccountId::CURRENT)
        .vault_name(vault)
        .send()
        .await
    {
        for upload in uploads.uploads_list() {
            if let Some(id) = upload.multipart_upload_id() {
                let _ = client
                    .abort_multipart_upload()
                    .account_id(AccountId::CURRENT)
                    .vault_name(vault)
                    .upload_id(id)
                    .send()
                    .await;
            }
        }
    }

    let _ = client
        .delete_vault()
        .account_id(AccountId::CURRENT)
        .vault_name(vault)
        .send()
        .await;
}

/// Delete a single archive, ignoring failures.
pub async fn delete_archive(client: &aws_sdk_glacier::Client, vault: &str, archive_id: &str) {
    let _ = client
        .delete_archive()
        .account_id(AccountId::CURRENT)
        .vault_name(vault)
        .archive_id(archive_id)
        .send()
        .await;
}

/// Write `len` bytes of a repeating pattern to `name` inside `dir`.
#[must_use]
pub fn write_fixture(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).expect("write fixture");
    path
}

mod test_error;
mod test_upload;
