use serde::{Deserialize, Serialize};
use validator::Validate;

/// One entry of a pre-signed URL batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PresignedUrlRequestItem {
    /// Generated object name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,
    /// Content type the upload will be sent with
    #[serde(rename = "type")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
}

/// Server-issued pairing of a generated name and a time-limited write URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedSlot {
    pub name: String,
    pub url: String,
}
