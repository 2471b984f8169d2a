//! End-to-end ingest: validate → convert → upload → create album.
//!
//! Run with: `cargo test -p album-processing --test ingest_flow_test`

mod helpers;

use album_core::models::{ReasonCode, Verdict};
use album_core::{mime, AppError, IngestConfig};
use album_processing::{AlbumTarget, HeicConverter, IngestPipeline};
use helpers::fixtures::{corrupt_heic, heic, jpeg, png, MIB};
use helpers::{fast_retry, FakeBackend, FakeHeicDecoder, FakeUploader};
use std::sync::Arc;

fn pipeline(backend: &Arc<FakeBackend>, uploader: &Arc<FakeUploader>) -> IngestPipeline {
    let config = IngestConfig {
        retry: fast_retry(),
        ..IngestConfig::default()
    };
    IngestPipeline::from_config(&config, backend.clone(), uploader.clone()).with_converter(
        HeicConverter::with_decoder(config.conversion.clone(), Arc::new(FakeHeicDecoder)),
    )
}

#[tokio::test]
async fn test_mixed_batch_creates_album_from_survivors() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());

    let candidates = vec![
        jpeg("beach.jpg", 2 * MIB),
        png("panorama.png", 12 * MIB),
        heic("IMG_0042.HEIC", 3 * MIB),
    ];

    let mut progress = Vec::new();
    let report = pipeline(&backend, &uploader)
        .run(&AlbumTarget::create("Jeju trip"), candidates, |p| {
            progress.push((p.current, p.total, p.result.verdict));
        })
        .await
        .unwrap();

    assert_eq!(
        progress,
        vec![
            (1, 3, Verdict::Pass),
            (2, 3, Verdict::Fail),
            (3, 3, Verdict::Pass),
        ]
    );

    let validation = &report.validation;
    assert_eq!(validation.total, 3);
    assert_eq!(validation.valid, 2);
    assert_eq!(validation.invalid, 1);
    assert!(validation.results[1].has_code(ReasonCode::FileTooLarge));
    assert!(validation.results[2].needs_conversion);
    assert!(report.conversion_failures.is_empty());

    let requests = backend.presign_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 2);
    assert!(requests[0].iter().all(|item| item.content_type == "image/jpeg"));
    assert!(requests[0].iter().all(|item| item.name.ends_with(".jpg")));

    let puts = uploader.puts.lock().unwrap().clone();
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[0].data.len(), 2 * MIB);
    assert_eq!(puts[1].content_type, "image/jpeg");
    assert_eq!(mime::sniff_content_type(&puts[1].data), Some("image/jpeg"));

    let created = backend.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Jeju trip");
    assert_eq!(created[0].pictures.len(), 2);

    let names: Vec<_> = report
        .upload
        .uploaded
        .iter()
        .map(|p| p.original_name.as_str())
        .collect();
    assert_eq!(names, vec!["beach.jpg", "IMG_0042.jpg"]);
}

#[tokio::test]
async fn test_conversion_failure_is_reported_and_excluded() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());

    let report = pipeline(&backend, &uploader)
        .run(
            &AlbumTarget::append("42"),
            vec![jpeg("beach.jpg", 4096), corrupt_heic("IMG_0043.HEIC", 4096)],
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(report.validation.valid, 2);
    assert_eq!(report.conversion_failures.len(), 1);
    assert_eq!(report.conversion_failures[0].candidate.name, "IMG_0043.HEIC");
    assert_eq!(report.upload.uploaded.len(), 1);
    assert_eq!(uploader.put_count(), 1);
    assert_eq!(backend.appended.lock().unwrap()[0].1.pictures.len(), 1);
}

#[tokio::test]
async fn test_nothing_valid_never_reaches_backend() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());

    let err = pipeline(&backend, &uploader)
        .run(
            &AlbumTarget::create("Jeju trip"),
            vec![png("panorama.png", 12 * MIB), jpeg("tiny.jpg", 100)],
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err.source, AppError::InvalidInput(_)));
    assert_eq!(backend.presign_calls(), 0);
    assert_eq!(uploader.put_count(), 0);

    // Every file keeps its reason so the user knows what to fix
    let results = &err.validation.results;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].file_name.as_deref(), Some("panorama.png"));
    assert!(results[0].has_code(ReasonCode::FileTooLarge));
    assert_eq!(results[1].file_name.as_deref(), Some("tiny.jpg"));
    assert!(results[1].has_code(ReasonCode::FileTooSmall));
    assert_eq!(err.validation.reason_counts[&ReasonCode::FileTooLarge], 1);
}

#[tokio::test]
async fn test_missing_file_is_reported_and_batch_continues() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());

    let report = pipeline(&backend, &uploader)
        .run(
            &AlbumTarget::create("Jeju trip"),
            vec![Some(jpeg("beach.jpg", 4096)), None],
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(report.validation.invalid, 1);
    assert!(report.validation.results[1].has_code(ReasonCode::FileMissing));
    assert_eq!(report.upload.uploaded.len(), 1);
    assert_eq!(uploader.put_count(), 1);
}

#[tokio::test]
async fn test_all_conversions_failing_keeps_reports() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());

    let err = pipeline(&backend, &uploader)
        .run(
            &AlbumTarget::create("Jeju trip"),
            vec![
                corrupt_heic("IMG_0043.HEIC", 4096),
                png("panorama.png", 12 * MIB),
            ],
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err.source, AppError::InvalidInput(_)));
    assert_eq!(err.validation.invalid, 1);
    assert_eq!(err.conversion_failures.len(), 1);
    assert_eq!(err.conversion_failures[0].candidate.name, "IMG_0043.HEIC");
    assert_eq!(backend.presign_calls(), 0);
}

#[tokio::test]
async fn test_upload_failure_keeps_reports() {
    let backend = Arc::new(FakeBackend::new());
    let uploader = Arc::new(FakeUploader::new());
    backend.fail_persist(AppError::Api {
        status: 500,
        body: "boom".to_string(),
    });

    let err = pipeline(&backend, &uploader)
        .run(
            &AlbumTarget::create("Jeju trip"),
            vec![
                jpeg("beach.jpg", 4096),
                jpeg("tiny.jpg", 100),
                corrupt_heic("IMG_0043.HEIC", 4096),
            ],
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err.source, AppError::Upload { .. }));
    assert!(err.validation.results[1].has_code(ReasonCode::FileTooSmall));
    assert_eq!(err.conversion_failures.len(), 1);
    assert_eq!(uploader.put_count(), 1);
}
