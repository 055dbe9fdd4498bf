use std::io;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::StoragePath;

#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Streams an object into the store, returning the number of bytes
    /// written.
    async fn store(
        &self,
        path: &StoragePath,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, MediaStoreError>;

    async fn fetch(&self, path: &StoragePath) -> Result<Vec<u8>, MediaStoreError>;

    async fn delete(&self, path: &StoragePath) -> Result<(), MediaStoreError>;

    async fn head(&self, path: &StoragePath) -> Result<u64, MediaStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
