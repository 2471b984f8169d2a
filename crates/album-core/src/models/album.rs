use serde::{Deserialize, Serialize};
use validator::Validate;

/// Geolocation attached to an album picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Placeholder used until the picture's EXIF position is known.
    pub const PLACEHOLDER: GeoLocation = GeoLocation {
        latitude: 0.0,
        longitude: 0.0,
    };
}

/// Durable reference to an uploaded picture, persisted with the album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumPictureReference {
    /// Storage key (generated object name)
    pub key: String,
    /// Object URL without signing parameters
    pub url: String,
    #[serde(flatten)]
    pub location: GeoLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAlbumRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "At least one picture is required"))]
    pub pictures: Vec<AlbumPictureReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddPicturesRequest {
    #[validate(length(min = 1, message = "At least one picture is required"))]
    pub pictures: Vec<AlbumPictureReference>,
}

/// Album as returned by the backend after creation or append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumResponse {
    pub id: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pictures: Vec<AlbumPictureReference>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
