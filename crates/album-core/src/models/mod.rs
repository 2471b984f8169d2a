//! Data models for the ingestion pipeline
//!
//! Organized by domain: candidates and their validation results, pre-signed upload
//! slots, album records, and authentication tokens.

mod album;
mod auth;
mod candidate;
mod presigned;
mod validation;

// Re-export all models for convenient imports
pub use album::*;
pub use auth::*;
pub use candidate::*;
pub use presigned::*;
pub use validation::*;
