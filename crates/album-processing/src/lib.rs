//! Album Processing Library
//!
//! This crate implements the picture ingestion pipeline: file validation, HEIC
//! conversion and upload orchestration, plus [`IngestPipeline`] chaining the three.
//!
//! # Features
//!
//! - `heif`: decode HEIC/HEIF through the system libheif. Without it, HEIC files
//!   fail conversion unless a custom [`HeicDecoder`] is supplied.

pub mod convert;
pub mod ingest;
pub mod upload;
pub mod validator;

// Re-export commonly used types
#[cfg(feature = "heif")]
pub use convert::LibHeifDecoder;
pub use convert::{
    default_decoder, ConversionFailure, ConversionOutcome, HeicConverter, HeicDecoder,
    UnsupportedHeicDecoder,
};
pub use ingest::{IngestError, IngestPipeline, IngestReport};
pub use upload::{AlbumTarget, UploadOrchestrator, UploadOutcome, UploadedPicture};
pub use self::validator::FileValidator;
