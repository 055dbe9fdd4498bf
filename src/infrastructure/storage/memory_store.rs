use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::application::ports::{MediaStore, MediaStoreError};
use crate::domain::StoragePath;

/// Map-backed media store for tests and scaffolding.
#[derive(Default)]
pub struct InMemoryMediaStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn store(
        &self,
        path: &StoragePath,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, MediaStoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        let total = data.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert(path.as_str().to_string(), data);
        Ok(total)
    }

    async fn fetch(&self, path: &StoragePath) -> Result<Vec<u8>, MediaStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| MediaStoreError::NotFound(path.as_str().to_string()))
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), MediaStoreError> {
        self.objects
            .lock()
            .unwrap()
            .remove(path.as_str())
            .map(|_| ())
            .ok_or_else(|| MediaStoreError::DeleteFailed(path.as_str().to_string()))
    }

    async fn head(&self, path: &StoragePath) -> Result<u64, MediaStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(path.as_str())
            .map(|data| data.len() as u64)
            .ok_or_else(|| MediaStoreError::NotFound(path.as_str().to_string()))
    }
}
