//! Helpers shared by the `album` binary: file loading, report rendering, tracing.

use std::path::Path;

use album_core::mime;
use album_core::models::UploadCandidate;
use album_core::models::BatchValidationSummary;
use album_processing::{ConversionFailure, ConversionOutcome, IngestError, IngestReport};
use anyhow::Context;
use serde_json::{json, Value};

/// Read a file from disk as an upload candidate.
///
/// The content type follows the extension; files with an unknown extension are
/// typed from their leading bytes when possible.
pub async fn load_candidate(path: &Path) -> anyhow::Result<UploadCandidate> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();

    let mut content_type = mime::content_type_from_filename(&name);
    if content_type == "application/octet-stream" {
        if let Some(detected) = mime::sniff_content_type(&data) {
            content_type = detected.to_string();
        }
    }

    Ok(UploadCandidate::new(name, content_type, data))
}

/// Load every path, in order. A path that cannot be read becomes `None` so the
/// validator reports it as missing instead of aborting the batch.
pub async fn load_entries(paths: &[impl AsRef<Path>]) -> Vec<Option<UploadCandidate>> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match load_candidate(path).await {
            Ok(candidate) => entries.push(Some(candidate)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not load file");
                entries.push(None);
            }
        }
    }
    entries
}

/// Display label per path, used for files that could not be loaded.
pub fn file_labels(paths: &[impl AsRef<Path>]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            p.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect()
}

/// Write converted candidates into `out_dir`, returning the written paths.
pub async fn write_candidates(
    out_dir: &Path,
    candidates: &[UploadCandidate],
) -> anyhow::Result<Vec<String>> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let path = out_dir.join(&candidate.name);
        tokio::fs::write(&path, &candidate.data)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        written.push(path.display().to_string());
    }
    Ok(written)
}

fn failures_json(failures: &[ConversionFailure]) -> Vec<Value> {
    failures
        .iter()
        .map(|f| json!({ "file": f.candidate.name, "error": f.error.to_string() }))
        .collect()
}

pub fn conversion_report(outcome: &ConversionOutcome, written: &[String]) -> Value {
    json!({
        "converted": written,
        "failed": failures_json(&outcome.failed),
    })
}

/// Per-file validation results. `labels` name the inputs in order, for entries
/// whose file could not be loaded.
pub fn validation_report(summary: &BatchValidationSummary, labels: &[String]) -> Value {
    let files = summary
        .results
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let file = r
                .file_name
                .clone()
                .or_else(|| labels.get(index).cloned());
            json!({
                "file": file,
                "verdict": r.verdict,
                "needs_conversion": r.needs_conversion,
                "reasons": r.reason_codes().collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "total": summary.total,
        "valid": summary.valid,
        "invalid": summary.invalid,
        "warned": summary.warned,
        "reason_counts": summary.reason_counts,
        "files": files,
    })
}

pub fn ingest_report(report: &IngestReport, labels: &[String]) -> Value {
    json!({
        "album": report.upload.album,
        "uploaded": report.upload.uploaded,
        "skipped": report.upload.skipped,
        "validation": validation_report(&report.validation, labels),
        "conversion_failures": failures_json(&report.conversion_failures),
    })
}

pub fn ingest_failure_report(error: &IngestError, labels: &[String]) -> Value {
    json!({
        "error": error.source.detailed_message(),
        "validation": validation_report(&error.validation, labels),
        "conversion_failures": failures_json(&error.conversion_failures),
    })
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
