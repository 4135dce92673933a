//! Error-path integration tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use coldpush_core::{ChunkSize, UploadConfig, VaultName};
    use coldpush_upload::treehash::tree_hash;
    use coldpush_upload::{
        ArchiveService, ByteRange, ServiceError, UploadDriver, UploadError, UploadJob,
    };

    use crate::{cleanup_vault, create_test_vault, glacier_client, glacier_service, test_vault_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fail_session_for_missing_vault() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = crate::write_fixture(dir.path(), "orphan.bin", 10);
        let config = UploadConfig::builder()
            .vault(test_vault_name("missing"))
            .file(path)
            .build();
        let job = UploadJob::from_config(&config).expect("valid job");

        let err = UploadDriver::new(glacier_service(), job)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Session(ServiceError::InvalidContainer(_))
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_part_with_wrong_checksum() {
        let client = glacier_client();
        let vault = create_test_vault(&client, "badpart").await;
        let service = glacier_service();

        let session = service
            .initiate(
                &VaultName::new(vault.clone()).expect("vault"),
                "bad part",
                ChunkSize::MIN,
            )
            .await
            .expect("initiate");

        let payload = Bytes::from_static(b"hello glacier");
        let range = ByteRange::from_start_len(0, payload.len() as u64).expect("range");
        let result = service
            .upload_part(&session, range, payload, tree_hash(b"something else"))
            .await;
        assert!(result.is_err(), "corrupt part must be rejected");

        cleanup_vault(&client, &vault).await;
    }
}
