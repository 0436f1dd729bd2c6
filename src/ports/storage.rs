use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage request failed: {0}")]
    Transient(String),
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote object store holding sources and published artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Every key under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Download an object to a local path
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StoreError>;

    /// Upload a local file, replacing any object at `key`
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), StoreError>;

    /// Read a (small) object fully into memory
    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Address clients can fetch `key` from.
    fn public_url(&self, key: &str) -> String;
}
