//! Storage backend abstraction.
//!
//! Provides a pluggable storage layer for uploaded PDF files, backed by:
//! - Local filesystem (default)
//! - S3-compatible object storage (AWS S3, MinIO, R2, etc.)

#![allow(dead_code)] // Public API methods for future use

mod backend;
mod config;
mod local;
mod s3;

pub use backend::{StorageBackend, StorageError, StorageResult};
pub use config::{StorageConfig, StorageType};
pub use local::LocalStorage;
pub use s3::{S3Config, S3Storage};
