//! Storage backend trait definition.
//!
//! Abstraction over where uploaded PDF files live (local filesystem, S3).
//! Keys are opaque strings assigned at upload time.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Storage error types
#[derive(Debug)]
pub enum StorageError {
    /// Object not found
    NotFound(String),
    /// IO error
    Io(std::io::Error),
    /// Other error
    Other(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(key) => write!(f, "Object not found: {}", key),
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Other(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend trait for pluggable PDF file storage.
///
/// `delete` must be idempotent: deleting a key that is already gone is not an
/// error, so a re-run of a partially-failed cascade delete converges.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get an object by key
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object by key
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object by key
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
