//! Storage configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{LocalStorage, S3Config, S3Storage, StorageBackend};

/// Storage backend type
#[derive(Debug, Clone)]
pub enum StorageType {
    /// Local filesystem storage
    Local { path: PathBuf },
    /// S3-compatible storage (AWS S3, MinIO, R2, etc.)
    S3(S3Config),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage backend type
    pub storage_type: StorageType,
}

impl StorageConfig {
    /// Create config for local storage at the given path
    pub fn local(path: PathBuf) -> Self {
        Self {
            storage_type: StorageType::Local { path },
        }
    }

    /// Create config for AWS S3 storage
    pub fn s3(bucket: String, region: String) -> Self {
        Self {
            storage_type: StorageType::S3(S3Config::aws(bucket, region)),
        }
    }

    /// Create config for MinIO or other S3-compatible storage
    pub fn minio(bucket: String, endpoint: String) -> Self {
        Self {
            storage_type: StorageType::S3(S3Config::minio(bucket, endpoint)),
        }
    }

    /// Read storage configuration from the environment.
    ///
    /// `STUDENT_POWER_S3_BUCKET` selects S3 (with optional
    /// `STUDENT_POWER_S3_ENDPOINT` for MinIO-style deployments and
    /// `STUDENT_POWER_S3_REGION`, default us-east-1); otherwise files are
    /// stored under `{data_dir}/files`.
    pub fn from_env(data_dir: &Path) -> Self {
        if let Ok(bucket) = std::env::var("STUDENT_POWER_S3_BUCKET") {
            let config = match std::env::var("STUDENT_POWER_S3_ENDPOINT") {
                Ok(endpoint) => S3Config::minio(bucket, endpoint),
                Err(_) => {
                    let region = std::env::var("STUDENT_POWER_S3_REGION")
                        .unwrap_or_else(|_| "us-east-1".to_string());
                    S3Config::aws(bucket, region)
                }
            };
            return Self {
                storage_type: StorageType::S3(config.with_prefix("pdfs/".to_string())),
            };
        }

        Self::local(data_dir.join("files"))
    }

    /// Build a storage backend from this config
    pub async fn build(&self) -> Arc<dyn StorageBackend> {
        match &self.storage_type {
            StorageType::Local { path } => {
                std::fs::create_dir_all(path).ok();
                Arc::new(LocalStorage::new(path.clone()))
            }
            StorageType::S3(config) => Arc::new(S3Storage::new(config.clone()).await),
        }
    }
}
