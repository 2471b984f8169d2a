//! Types for the upload orchestrator.

use album_core::models::AlbumResponse;
use serde::Serialize;

/// Where uploaded pictures end up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlbumTarget {
    /// Create a new album with this title
    Create { title: String },
    /// Append to an existing album
    Append { album_id: String },
}

impl AlbumTarget {
    pub fn create(title: impl Into<String>) -> Self {
        AlbumTarget::Create {
            title: title.into(),
        }
    }

    pub fn append(album_id: impl Into<String>) -> Self {
        AlbumTarget::Append {
            album_id: album_id.into(),
        }
    }
}

/// One picture stored in object storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadedPicture {
    /// Name the file had when it was selected (after conversion)
    pub original_name: String,
    /// Generated object name
    pub key: String,
    /// Object URL without signing parameters
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Result of a successful orchestration.
#[derive(Clone, Debug, Serialize)]
pub struct UploadOutcome {
    /// Album as returned by the backend
    pub album: AlbumResponse,
    pub uploaded: Vec<UploadedPicture>,
    /// Files left out because the backend returned no slot for them
    pub skipped: Vec<String>,
}
