//! Domain methods for the album API client.

use album_core::models::{
    AddPicturesRequest, AlbumResponse, CreateAlbumRequest, PresignedSlot, PresignedUrlRequestItem,
};
use album_core::{AlbumBackend, AppError};
use async_trait::async_trait;

use crate::ApiClient;

impl ApiClient {
    /// Request one pre-signed PUT URL per item. Matches POST /presigned-url.
    pub async fn request_presigned_urls(
        &self,
        items: &[PresignedUrlRequestItem],
    ) -> Result<Vec<PresignedSlot>, AppError> {
        self.post_json("/presigned-url", items).await
    }

    /// Create an album. Matches POST /albums.
    pub async fn create_album(
        &self,
        request: &CreateAlbumRequest,
    ) -> Result<AlbumResponse, AppError> {
        self.post_json("/albums", request).await
    }

    /// Append pictures to an album. Matches POST /albums/{id}/pictures.
    pub async fn add_album_pictures(
        &self,
        album_id: &str,
        request: &AddPicturesRequest,
    ) -> Result<AlbumResponse, AppError> {
        self.post_json(&format!("/albums/{}/pictures", album_id), request)
            .await
    }

    /// Fetch an album. Matches GET /albums/{id}.
    pub async fn get_album(&self, album_id: &str) -> Result<AlbumResponse, AppError> {
        self.get(&format!("/albums/{}", album_id), &[]).await
    }
}

#[async_trait]
impl AlbumBackend for ApiClient {
    async fn request_presigned_urls(
        &self,
        items: &[PresignedUrlRequestItem],
    ) -> Result<Vec<PresignedSlot>, AppError> {
        ApiClient::request_presigned_urls(self, items).await
    }

    async fn create_album(&self, request: &CreateAlbumRequest) -> Result<AlbumResponse, AppError> {
        ApiClient::create_album(self, request).await
    }

    async fn add_album_pictures(
        &self,
        album_id: &str,
        request: &AddPicturesRequest,
    ) -> Result<AlbumResponse, AppError> {
        ApiClient::add_album_pictures(self, album_id, request).await
    }
}
