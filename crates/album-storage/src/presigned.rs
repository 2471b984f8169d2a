use crate::traits::{ObjectUploader, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Uploads objects with a plain HTTP PUT to pre-signed URLs.
///
/// No credentials are attached: the signature is part of the URL.
#[derive(Clone, Debug)]
pub struct PresignedPutUploader {
    client: Client,
}

impl PresignedPutUploader {
    pub fn new(timeout: Duration) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectUploader for PresignedPutUploader {
    async fn put_object(&self, url: &str, content_type: &str, data: Bytes) -> StorageResult<()> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(StorageError::InvalidUrl(url.to_string()));
        }

        let size = data.len();
        let start = std::time::Instant::now();

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, content_type = %content_type, "Object upload request failed");
                StorageError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = status.as_u16(),
                content_type = %content_type,
                size_bytes = size,
                "Object storage rejected upload"
            );
            return Err(StorageError::UploadFailed {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Object uploaded"
        );

        Ok(())
    }
}
