//! Ingest pipeline: validate → convert → upload.

use std::sync::Arc;

use album_core::models::{BatchValidationSummary, UploadCandidate, ValidationProgress};
use album_core::{AlbumBackend, AppError, IngestConfig};
use album_storage::ObjectUploader;

use crate::convert::{ConversionFailure, HeicConverter};
use crate::upload::{AlbumTarget, UploadOrchestrator, UploadOutcome};
use crate::validator::FileValidator;

/// Everything that happened to a batch that reached the backend.
#[derive(Debug)]
pub struct IngestReport {
    pub validation: BatchValidationSummary,
    /// HEIC files that could not be converted and were left out
    pub conversion_failures: Vec<ConversionFailure>,
    pub upload: UploadOutcome,
}

/// A batch that did not produce an album.
///
/// Per-file validation and conversion results are kept so the caller can tell the
/// user which files to drop before retrying.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct IngestError {
    pub validation: BatchValidationSummary,
    pub conversion_failures: Vec<ConversionFailure>,
    pub source: AppError,
}

impl IngestError {
    fn new(
        validation: BatchValidationSummary,
        conversion_failures: Vec<ConversionFailure>,
        source: AppError,
    ) -> Self {
        Self {
            validation,
            conversion_failures,
            source,
        }
    }
}

pub struct IngestPipeline {
    validator: FileValidator,
    converter: HeicConverter,
    orchestrator: UploadOrchestrator,
}

impl IngestPipeline {
    pub fn new(
        validator: FileValidator,
        converter: HeicConverter,
        orchestrator: UploadOrchestrator,
    ) -> Self {
        Self {
            validator,
            converter,
            orchestrator,
        }
    }

    /// Build a pipeline from configuration with the default HEIC decoder.
    pub fn from_config(
        config: &IngestConfig,
        backend: Arc<dyn AlbumBackend>,
        uploader: Arc<dyn ObjectUploader>,
    ) -> Self {
        Self::new(
            FileValidator::new(config.validation.clone()),
            HeicConverter::new(config.conversion.clone()),
            UploadOrchestrator::new(backend, uploader)
                .with_retry_policy(config.retry.clone())
                .with_missing_slot_policy(config.missing_slot_policy),
        )
    }

    pub fn with_converter(mut self, converter: HeicConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Run the whole pipeline over `candidates`.
    ///
    /// Entries may be `None` for files that could not be read; they fail validation
    /// with `FILE_MISSING`. Files that fail validation or conversion are dropped and
    /// reported; the rest are uploaded as one batch. The per-file reports are
    /// returned on failure too.
    pub async fn run<I, C, F>(
        &self,
        target: &AlbumTarget,
        candidates: I,
        on_progress: F,
    ) -> Result<IngestReport, IngestError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Option<UploadCandidate>>,
        F: FnMut(ValidationProgress<'_>),
    {
        let entries = candidates
            .into_iter()
            .map(Into::into)
            .collect::<Vec<Option<UploadCandidate>>>();
        let validation = self.validator.validate_entries(&entries, on_progress);

        let accepted = entries
            .into_iter()
            .zip(validation.results.iter())
            .filter(|(_, result)| result.is_valid())
            .filter_map(|(candidate, _)| candidate)
            .collect::<Vec<_>>();
        if accepted.is_empty() {
            let error = AppError::InvalidInput(format!(
                "None of the {} files passed validation",
                validation.total
            ));
            return Err(IngestError::new(validation, Vec::new(), error));
        }

        let conversion = self.converter.convert_batch(accepted).await;
        if conversion.processed.is_empty() {
            let error = AppError::InvalidInput(format!(
                "None of the files could be converted ({} failed)",
                conversion.failed.len()
            ));
            return Err(IngestError::new(validation, conversion.failed, error));
        }

        tracing::info!(
            accepted = conversion.processed.len(),
            rejected = validation.invalid,
            conversion_failures = conversion.failed.len(),
            "Starting upload"
        );

        match self.orchestrator.upload(target, conversion.processed).await {
            Ok(upload) => Ok(IngestReport {
                validation,
                conversion_failures: conversion.failed,
                upload,
            }),
            Err(error) => Err(IngestError::new(validation, conversion.failed, error)),
        }
    }
}
