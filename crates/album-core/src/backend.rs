//! Backend seam used by the upload orchestrator.
//!
//! The REST client implements this trait; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    AddPicturesRequest, AlbumResponse, CreateAlbumRequest, PresignedSlot, PresignedUrlRequestItem,
};

#[async_trait]
pub trait AlbumBackend: Send + Sync {
    /// Request one write-once upload URL per item, keyed by the item's name.
    async fn request_presigned_urls(
        &self,
        items: &[PresignedUrlRequestItem],
    ) -> Result<Vec<PresignedSlot>, AppError>;

    /// Create a new album from already-uploaded pictures.
    async fn create_album(&self, request: &CreateAlbumRequest) -> Result<AlbumResponse, AppError>;

    /// Append already-uploaded pictures to an existing album.
    async fn add_album_pictures(
        &self,
        album_id: &str,
        request: &AddPicturesRequest,
    ) -> Result<AlbumResponse, AppError>;
}
