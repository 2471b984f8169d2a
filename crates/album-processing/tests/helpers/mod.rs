//! Test helpers: in-memory backend, uploader and HEIC decoder.
//!
//! Run from workspace root: `cargo test -p album-processing`.

#![allow(dead_code)]

pub mod fixtures;

use album_core::models::{
    AddPicturesRequest, AlbumPictureReference, AlbumResponse, CreateAlbumRequest, PresignedSlot,
    PresignedUrlRequestItem,
};
use album_core::{AlbumBackend, AppError, RetryPolicy};
use album_processing::HeicDecoder;
use album_storage::{ObjectUploader, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const BUCKET_URL: &str = "https://bucket.test/pictures";

/// Retry policy with millisecond delays.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

/// Album backend that records every call.
#[derive(Default)]
pub struct FakeBackend {
    pub presign_requests: Mutex<Vec<Vec<PresignedUrlRequestItem>>>,
    pub created: Mutex<Vec<CreateAlbumRequest>>,
    pub appended: Mutex<Vec<(String, AddPicturesRequest)>>,
    presign_failures: Mutex<VecDeque<AppError>>,
    persist_failures: Mutex<VecDeque<AppError>>,
    /// Number of trailing items that get no slot
    omitted_slots: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omitting_slots(count: usize) -> Self {
        Self {
            omitted_slots: count,
            ..Self::default()
        }
    }

    pub fn fail_presign(&self, error: AppError) {
        self.presign_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_persist(&self, error: AppError) {
        self.persist_failures.lock().unwrap().push_back(error);
    }

    pub fn presign_calls(&self) -> usize {
        self.presign_requests.lock().unwrap().len()
    }

    fn album(title: Option<String>, pictures: &[AlbumPictureReference]) -> AlbumResponse {
        AlbumResponse {
            id: serde_json::json!(7),
            title,
            pictures: pictures.to_vec(),
            extra: serde_json::Map::new(),
        }
    }
}

#[async_trait]
impl AlbumBackend for FakeBackend {
    async fn request_presigned_urls(
        &self,
        items: &[PresignedUrlRequestItem],
    ) -> Result<Vec<PresignedSlot>, AppError> {
        self.presign_requests.lock().unwrap().push(items.to_vec());
        if let Some(error) = self.presign_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let served = items.len().saturating_sub(self.omitted_slots);
        Ok(items
            .iter()
            .take(served)
            .map(|item| PresignedSlot {
                name: item.name.clone(),
                url: format!("{}/{}?X-Amz-Signature=sig", BUCKET_URL, item.name),
            })
            .collect())
    }

    async fn create_album(&self, request: &CreateAlbumRequest) -> Result<AlbumResponse, AppError> {
        self.created.lock().unwrap().push(request.clone());
        if let Some(error) = self.persist_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(Self::album(Some(request.title.clone()), &request.pictures))
    }

    async fn add_album_pictures(
        &self,
        album_id: &str,
        request: &AddPicturesRequest,
    ) -> Result<AlbumResponse, AppError> {
        self.appended
            .lock()
            .unwrap()
            .push((album_id.to_string(), request.clone()));
        if let Some(error) = self.persist_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(Self::album(None, &request.pictures))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PutRecord {
    pub url: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Object uploader that records PUTs and fails on demand.
#[derive(Default)]
pub struct FakeUploader {
    pub puts: Mutex<Vec<PutRecord>>,
    failures: Mutex<VecDeque<StorageError>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: StorageError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectUploader for FakeUploader {
    async fn put_object(&self, url: &str, content_type: &str, data: Bytes) -> StorageResult<()> {
        self.puts.lock().unwrap().push(PutRecord {
            url: url.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Decoder that yields a small blank image, or fails for data starting with `corrupt`.
pub struct FakeHeicDecoder;

impl HeicDecoder for FakeHeicDecoder {
    fn decode(&self, data: &[u8]) -> anyhow::Result<DynamicImage> {
        if data.starts_with(b"corrupt") {
            anyhow::bail!("invalid HEIF container");
        }
        Ok(DynamicImage::new_rgb8(16, 12))
    }
}
