//! Upload orchestrator
//!
//! Sequence for a batch of validated (and converted) candidates:
//!
//! 1. **Rename**: every candidate gets a generated `{uuid}.{ext}` object name.
//! 2. **Presign**: one batch request for write URLs, keyed by object name.
//! 3. **Upload**: bytes are PUT to each URL in input order, one at a time.
//! 4. **Persist**: the album is created (or appended to) with the object references.
//!
//! Presign and upload are retried on transient failures. Persist is not retried
//! since album creation is not idempotent. Any error aborts the batch and is wrapped
//! with the failing step and, where isolable, the file name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use album_core::models::{
    AddPicturesRequest, AlbumPictureReference, AlbumResponse, CreateAlbumRequest, GeoLocation,
    PresignedUrlRequestItem, UploadCandidate,
};
use album_core::{with_retry, AlbumBackend, AppError, MissingSlotPolicy, RetryPolicy, UploadStep};
use album_storage::{generate_object_name, object_url, ObjectUploader};
use validator::Validate;

use super::types::{AlbumTarget, UploadOutcome, UploadedPicture};

const MAX_TITLE_LENGTH: usize = 100;

struct RenamedCandidate {
    object_name: String,
    candidate: UploadCandidate,
}

pub struct UploadOrchestrator {
    backend: Arc<dyn AlbumBackend>,
    uploader: Arc<dyn ObjectUploader>,
    retry: RetryPolicy,
    missing_slot_policy: MissingSlotPolicy,
}

impl UploadOrchestrator {
    pub fn new(backend: Arc<dyn AlbumBackend>, uploader: Arc<dyn ObjectUploader>) -> Self {
        Self {
            backend,
            uploader,
            retry: RetryPolicy::default(),
            missing_slot_policy: MissingSlotPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_missing_slot_policy(mut self, policy: MissingSlotPolicy) -> Self {
        self.missing_slot_policy = policy;
        self
    }

    /// Upload `candidates` and attach them to `target`.
    pub async fn upload(
        &self,
        target: &AlbumTarget,
        candidates: Vec<UploadCandidate>,
    ) -> Result<UploadOutcome, AppError> {
        check_target(target)?;
        if candidates.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one file is required".to_string(),
            ));
        }

        let renamed = rename(candidates)?;
        let items = renamed
            .iter()
            .map(|r| PresignedUrlRequestItem {
                name: r.object_name.clone(),
                content_type: r.candidate.content_type.clone(),
            })
            .collect::<Vec<_>>();
        for item in &items {
            item.validate().map_err(|e| {
                AppError::from(e).at_step(UploadStep::Rename, Some(item.name.as_str()))
            })?;
        }

        tracing::info!(file_count = items.len(), "Requesting presigned upload URLs");
        let backend = self.backend.as_ref();
        let request_items = &items;
        let slots = with_retry(&self.retry, "presign", move || {
            backend.request_presigned_urls(request_items)
        })
        .await
        .map_err(|e| e.at_step(UploadStep::Presign, None))?;

        let mut slot_urls: HashMap<String, String> = slots
            .into_iter()
            .map(|slot| (slot.name, slot.url))
            .collect();

        let mut planned = Vec::with_capacity(renamed.len());
        let mut skipped = Vec::new();
        for r in renamed {
            match slot_urls.remove(&r.object_name) {
                Some(url) => planned.push((r, url)),
                None => match self.missing_slot_policy {
                    MissingSlotPolicy::Abort => {
                        return Err(AppError::MissingSlot(r.object_name.clone())
                            .at_step(UploadStep::Presign, Some(r.candidate.name.as_str())));
                    }
                    MissingSlotPolicy::Skip => {
                        tracing::warn!(
                            file = %r.candidate.name,
                            object_name = %r.object_name,
                            "No presigned URL returned for file, skipping"
                        );
                        skipped.push(r.candidate.name);
                    }
                },
            }
        }
        if !slot_urls.is_empty() {
            tracing::debug!(
                unexpected = slot_urls.len(),
                "Backend returned presigned URLs for unknown names"
            );
        }
        if planned.is_empty() {
            return Err(AppError::InvalidInput(
                "No file received an upload URL".to_string(),
            )
            .at_step(UploadStep::Presign, None));
        }

        let mut uploaded = Vec::with_capacity(planned.len());
        for (r, url) in planned {
            self.put_with_retry(&r, &url).await.map_err(|e| {
                e.at_step(UploadStep::Upload, Some(r.candidate.name.as_str()))
            })?;

            tracing::info!(
                file = %r.candidate.name,
                object_name = %r.object_name,
                size_bytes = r.candidate.size(),
                "Picture uploaded"
            );

            uploaded.push(UploadedPicture {
                original_name: r.candidate.name,
                key: r.object_name,
                url: object_url(&url),
                content_type: r.candidate.content_type,
                size_bytes: r.candidate.data.len() as u64,
            });
        }

        let pictures = uploaded
            .iter()
            .map(|p| AlbumPictureReference {
                key: p.key.clone(),
                url: p.url.clone(),
                location: GeoLocation::PLACEHOLDER,
            })
            .collect::<Vec<_>>();

        let album = self
            .persist(target, pictures)
            .await
            .map_err(|e| e.at_step(UploadStep::Persist, None))?;

        tracing::info!(
            album_id = %album.id,
            uploaded = uploaded.len(),
            skipped = skipped.len(),
            "Album pictures persisted"
        );

        Ok(UploadOutcome {
            album,
            uploaded,
            skipped,
        })
    }

    async fn put_with_retry(&self, renamed: &RenamedCandidate, url: &str) -> Result<(), AppError> {
        let uploader = self.uploader.as_ref();
        let content_type = renamed.candidate.content_type.as_str();
        let data = &renamed.candidate.data;
        with_retry(&self.retry, "put_object", move || async move {
            uploader
                .put_object(url, content_type, data.clone())
                .await
                .map_err(AppError::from)
        })
        .await
    }

    async fn persist(
        &self,
        target: &AlbumTarget,
        pictures: Vec<AlbumPictureReference>,
    ) -> Result<AlbumResponse, AppError> {
        match target {
            AlbumTarget::Create { title } => {
                let request = CreateAlbumRequest {
                    title: title.trim().to_string(),
                    pictures,
                };
                request.validate()?;
                self.backend.create_album(&request).await
            }
            AlbumTarget::Append { album_id } => {
                let request = AddPicturesRequest { pictures };
                request.validate()?;
                self.backend.add_album_pictures(album_id, &request).await
            }
        }
    }
}

fn check_target(target: &AlbumTarget) -> Result<(), AppError> {
    match target {
        AlbumTarget::Create { title } => {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::InvalidInput(
                    "Album title is required".to_string(),
                ));
            }
            if title.chars().count() > MAX_TITLE_LENGTH {
                return Err(AppError::InvalidInput(format!(
                    "Album title must be at most {} characters",
                    MAX_TITLE_LENGTH
                )));
            }
        }
        AlbumTarget::Append { album_id } => {
            if album_id.trim().is_empty() {
                return Err(AppError::InvalidInput("Album id is required".to_string()));
            }
        }
    }
    Ok(())
}

fn rename(candidates: Vec<UploadCandidate>) -> Result<Vec<RenamedCandidate>, AppError> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut renamed = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let extension = candidate.extension();
        let object_name = generate_object_name(&candidate.content_type, extension.as_deref());
        if !seen.insert(object_name.clone()) {
            return Err(AppError::Internal(format!(
                "Generated object name {} twice",
                object_name
            ))
            .at_step(UploadStep::Rename, Some(candidate.name.as_str())));
        }
        renamed.push(RenamedCandidate {
            object_name,
            candidate,
        });
    }

    Ok(renamed)
}
