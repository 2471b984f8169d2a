//! Album Storage Library
//!
//! This crate moves picture bytes straight to object storage through pre-signed
//! write URLs, so the application backend never proxies file content.
//!
//! # Object names
//!
//! Every uploaded object gets a generated name `{uuid}.{ext}` where `ext` follows
//! the (possibly converted) content type. Name generation lives in the `keys`
//! module so the orchestrator and tests agree on the format.

pub mod keys;
pub mod presigned;
pub mod traits;

// Re-export commonly used types
pub use keys::{generate_object_name, object_url};
pub use presigned::PresignedPutUploader;
pub use traits::{ObjectUploader, StorageError, StorageResult};
