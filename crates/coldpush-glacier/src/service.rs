//! [`ArchiveService`] backed by Amazon S3 Glacier.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_glacier::config::Region;
use aws_sdk_glacier::primitives::ByteStream;
use bytes::Bytes;
use coldpush_core::{AccountId, ChunkSize, ConfigError, UploadConfig, VaultName};
use coldpush_upload::{
    ArchiveReceipt, ArchiveService, ByteRange, ServiceError, TreeHash, UploadSession,
};
use tracing::{debug, warn};

use crate::error::from_sdk;

/// Glacier vault client.
///
/// Every request names the account explicitly: either the one configured,
/// the one the credentials belong to, or `-` for "the caller's account"
/// when that lookup fails.
#[derive(Debug, Clone)]
pub struct GlacierArchiveService {
    client: aws_sdk_glacier::Client,
    account_id: AccountId,
}

impl GlacierArchiveService {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_glacier::Client, account_id: AccountId) -> Self {
        Self { client, account_id }
    }

    /// Build a client from the SDK default credential and region chain,
    /// applying the region, endpoint and account overrides in `config`.
    ///
    /// When no account is configured, it is looked up from the credentials
    /// through STS.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAccountId`] if the configured account
    /// ID is malformed.
    pub async fn connect(config: &UploadConfig) -> Result<Self, ConfigError> {
        let configured_account = config
            .account_id
            .as_deref()
            .map(AccountId::new)
            .transpose()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_glacier::config::Builder::from(&shared);
        if let Some(url) = &config.endpoint_url {
            builder = builder.endpoint_url(url);
        }
        let client = aws_sdk_glacier::Client::from_conf(builder.build());

        let account_id = match configured_account {
            Some(id) => id,
            None => {
                let mut sts = aws_sdk_sts::config::Builder::from(&shared);
                if let Some(url) = &config.endpoint_url {
                    sts = sts.endpoint_url(url);
                }
                lookup_account(&aws_sdk_sts::Client::from_conf(sts.build())).await
            }
        };

        debug!(account_id = %account_id, region = ?shared.region(), "glacier client ready");
        Ok(Self::new(client, account_id))
    }

    /// Account every request is issued for.
    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }
}

/// The account the credentials belong to, or `-` if it cannot be determined.
async fn lookup_account(sts: &aws_sdk_sts::Client) -> AccountId {
    match sts.get_caller_identity().send().await {
        Ok(identity) => match identity.account().map(AccountId::new) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                warn!(error = %e, "caller identity returned an unusable account, using '-'");
                AccountId::default()
            }
            None => AccountId::default(),
        },
        Err(e) => {
            warn!(
                error = %aws_sdk_sts::error::DisplayErrorContext(&e),
                "failed to look up account, using '-'"
            );
            AccountId::default()
        }
    }
}

fn missing(operation: &str, field: &str) -> ServiceError {
    ServiceError::Transport(format!("{operation}: response has no {field}"))
}

#[async_trait]
impl ArchiveService for GlacierArchiveService {
    async fn initiate(
        &self,
        vault: &VaultName,
        description: &str,
        part_size: ChunkSize,
    ) -> Result<UploadSession, ServiceError> {
        let output = self
            .client
            .initiate_multipart_upload()
            .account_id(self.account_id.as_str())
            .vault_name(vault.as_str())
            .archive_description(description)
            .part_size(part_size.get().to_string())
            .send()
            .await
            .map_err(|e| from_sdk("initiate_multipart_upload", &e))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| missing("initiate_multipart_upload", "upload id"))?
            .to_owned();

        Ok(UploadSession {
            upload_id,
            vault: vault.clone(),
            account_id: self.account_id.clone(),
            part_size,
            location: output.location().map(str::to_owned),
        })
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        range: ByteRange,
        payload: Bytes,
        checksum: TreeHash,
    ) -> Result<TreeHash, ServiceError> {
        let output = self
            .client
            .upload_multipart_part()
            .account_id(session.account_id.as_str())
            .vault_name(session.vault.as_str())
            .upload_id(&session.upload_id)
            .range(range.to_string())
            .checksum(checksum.to_hex())
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|e| from_sdk("upload_multipart_part", &e))?;

        let reported = output
            .checksum()
            .ok_or_else(|| missing("upload_multipart_part", "checksum"))?;
        reported.parse::<TreeHash>().map_err(|e| {
            ServiceError::Transport(format!(
                "upload_multipart_part: invalid checksum {reported:?}: {e}"
            ))
        })
    }

    async fn complete(
        &self,
        session: &UploadSession,
        archive_size: u64,
        checksum: TreeHash,
    ) -> Result<ArchiveReceipt, ServiceError> {
        let output = self
            .client
            .complete_multipart_upload()
            .account_id(session.account_id.as_str())
            .vault_name(session.vault.as_str())
            .upload_id(&session.upload_id)
            .archive_size(archive_size.to_string())
            .checksum(checksum.to_hex())
            .send()
            .await
            .map_err(|e| from_sdk("complete_multipart_upload", &e))?;

        let archive_id = output
            .archive_id()
            .ok_or_else(|| missing("complete_multipart_upload", "archive id"))?
            .to_owned();

        Ok(ArchiveReceipt {
            archive_id,
            checksum: output.checksum().and_then(|c| c.parse().ok()),
            location: output.location().map(str::to_owned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> aws_sdk_glacier::Client {
        let config = aws_sdk_glacier::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:9")
            .build();
        aws_sdk_glacier::Client::from_conf(config)
    }

    #[test]
    fn test_should_keep_configured_account() {
        let account = AccountId::new("123456789012").expect("test account");
        let service = GlacierArchiveService::new(offline_client(), account.clone());
        assert_eq!(service.account_id(), &account);
    }

    #[tokio::test]
    async fn test_should_reject_malformed_account_override() {
        let config = UploadConfig::builder()
            .vault("v".into())
            .file("f".into())
            .account_id(Some("not-an-account".into()))
            .build();
        assert!(matches!(
            GlacierArchiveService::connect(&config).await,
            Err(ConfigError::InvalidAccountId(_))
        ));
    }

    #[test]
    fn test_should_describe_missing_response_fields() {
        assert_eq!(
            missing("complete_multipart_upload", "archive id").to_string(),
            "transport error: complete_multipart_upload: response has no archive id"
        );
    }
}
