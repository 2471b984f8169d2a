//! Album Core Library
//!
//! This crate provides the domain models, error types, configuration, MIME helpers
//! and retry policy shared by every crate of the picture ingestion workspace.

pub mod backend;
pub mod config;
pub mod error;
pub mod mime;
pub mod models;
pub mod retry;

// Re-export commonly used types
pub use backend::AlbumBackend;
pub use config::{
    ClientConfig, ConversionConfig, IngestConfig, MissingSlotPolicy, RetryPolicy,
    ValidationConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel, UploadStep};
pub use retry::with_retry;
