//! End-to-end upload integration tests.

#[cfg(test)]
mod tests {
    use coldpush_core::{ChunkSize, MIB, UploadConfig};
    use coldpush_upload::treehash::tree_hash_file;
    use coldpush_upload::{CheckpointStore, UploadDriver, UploadJob, UploadState};

    use crate::{
        cleanup_vault, create_test_vault, delete_archive, glacier_client, glacier_service,
        write_fixture,
    };

    fn job(vault: &str, path: &std::path::Path) -> UploadJob {
        let config = UploadConfig::builder()
            .vault(vault.to_owned())
            .file(path.to_owned())
            .chunk_size(ChunkSize::MIN)
            .build();
        UploadJob::from_config(&config).expect("valid job")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_multipart_archive() {
        let client = glacier_client();
        let vault = create_test_vault(&client, "upload").await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_fixture(dir.path(), "multi.bin", 2 * 1024 * 1024 + 17);

        let mut driver = UploadDriver::new(glacier_service(), job(&vault, &path));
        let report = driver.run().await.expect("upload");
        tracing::info!(archive_id = %report.archive_id, "uploaded");

        assert_eq!(driver.state(), UploadState::Finalized);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.archive_size, 2 * MIB + 17);
        assert_eq!(report.tree_hash, tree_hash_file(&path).expect("tree hash"));
        assert!(!report.archive_id.is_empty());

        delete_archive(&client, &vault, &report.archive_id).await;
        cleanup_vault(&client, &vault).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_empty_archive() {
        let client = glacier_client();
        let vault = create_test_vault(&client, "empty").await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_fixture(dir.path(), "empty.bin", 0);

        let report = UploadDriver::new(glacier_service(), job(&vault, &path))
            .run()
            .await
            .expect("upload");
        assert_eq!(report.chunks, 0);
        assert_eq!(report.archive_size, 0);

        delete_archive(&client, &vault, &report.archive_id).await;
        cleanup_vault(&client, &vault).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_remove_checkpoint_after_upload() {
        let client = glacier_client();
        let vault = create_test_vault(&client, "checkpoint").await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_fixture(dir.path(), "checkpoint.bin", 3 * 1024 * 1024);
        let store = CheckpointStore::new(dir.path().join("progress.json"));

        let report = UploadDriver::new(glacier_service(), job(&vault, &path))
            .with_checkpoint(store.clone(), false)
            .run()
            .await
            .expect("upload");

        assert_eq!(report.chunks, 3);
        assert_eq!(report.resumed_chunks, 0);
        assert!(!store.path().exists());

        delete_archive(&client, &vault, &report.archive_id).await;
        cleanup_vault(&client, &vault).await;
    }
}
