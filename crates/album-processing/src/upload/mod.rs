//! Upload orchestration: rename → presign → PUT → persist album.

pub mod orchestrator;
pub mod types;

pub use orchestrator::UploadOrchestrator;
pub use types::{AlbumTarget, UploadOutcome, UploadedPicture};
