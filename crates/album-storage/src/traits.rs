//! Storage abstraction trait
//!
//! This module defines the trait the upload orchestrator uses to write objects.

use album_core::error::is_transient_status;
use album_core::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed with status {status}: {message}")]
    UploadFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upload URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Transient failures that a retry may resolve.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Network(_) => true,
            StorageError::UploadFailed { status, .. } => is_transient_status(*status),
            StorageError::InvalidUrl(_) | StorageError::ConfigError(_) => false,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Network(msg) => AppError::Network(msg),
            StorageError::UploadFailed { status, message } => AppError::Api {
                status,
                body: message,
            },
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Writes an object to a URL that already carries its own credentials.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// PUT `data` to `url`, sending `content_type` as the transfer content type.
    async fn put_object(&self, url: &str, content_type: &str, data: Bytes) -> StorageResult<()>;
}
