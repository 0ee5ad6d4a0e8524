//! Persistence for the cache blob

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::CloudError;
use crate::filesys::file::File;

/// Loads and saves the serialized cache
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The saved blob, or `None` when nothing was saved yet
    async fn load(&self) -> Result<Option<String>, CloudError>;

    async fn save(&self, blob: &str) -> Result<(), CloudError>;
}

/// Blob kept in a single file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    file: File,
}

impl FileBlobStore {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self) -> Result<Option<String>, CloudError> {
        if !self.file.exists().await {
            return Ok(None);
        }
        self.file.read_string().await.map(Some)
    }

    async fn save(&self, blob: &str) -> Result<(), CloudError> {
        debug!("Saving cache blob to {}", self.file.path().display());
        self.file.write_atomic(blob.as_bytes()).await
    }
}

/// In-memory store, for runs without persistence
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self) -> Result<Option<String>, CloudError> {
        let blob = self.blob.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blob.clone())
    }

    async fn save(&self, blob: &str) -> Result<(), CloudError> {
        let mut stored = self.blob.lock().unwrap_or_else(|e| e.into_inner());
        *stored = Some(blob.to_string());
        Ok(())
    }
}
