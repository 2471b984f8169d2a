//! Error types module
//!
//! This module provides the error type shared by the ingestion pipeline. Validation
//! and conversion problems are reported per file as data, not as errors; `AppError`
//! covers what aborts an operation: network and backend failures, missing tokens,
//! codec failures of a single file, and the orchestration failures that wrap them.

use std::fmt;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like invalid input
    Debug,
    /// Warning level - for recoverable issues like transient network failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported and whether it may be retried.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "NETWORK_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is transient (the operation can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Step of the upload orchestration during which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    Rename,
    Presign,
    Upload,
    Persist,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStep::Rename => "rename",
            UploadStep::Presign => "presign",
            UploadStep::Upload => "upload",
            UploadStep::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Image conversion error: {0}")]
    Conversion(String),

    #[error("No presigned slot returned for {0}")]
    MissingSlot(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Upload failed during {step}{}", file_suffix(.file))]
    Upload {
        step: UploadStep,
        file: Option<String>,
        #[source]
        source: Box<AppError>,
    },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" for {}", f))
        .unwrap_or_default()
}

impl AppError {
    /// Wrap an error with the orchestration step (and file, when isolable) that produced it.
    pub fn at_step(self, step: UploadStep, file: Option<&str>) -> Self {
        AppError::Upload {
            step,
            file: file.map(str::to_string),
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping orchestration context.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Upload { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Whether an HTTP status denotes a transient failure worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the selected files and parameters"),
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            "UNAUTHORIZED",
            false,
            Some("Sign in again"),
            LogLevel::Debug,
        ),
        AppError::Api { status, .. } => {
            if is_transient_status(*status) {
                (
                    "API_UNAVAILABLE",
                    true,
                    Some("Retry after a short delay"),
                    LogLevel::Warn,
                )
            } else {
                (
                    "API_REJECTED",
                    false,
                    Some("Check the request and try again"),
                    LogLevel::Warn,
                )
            }
        }
        AppError::Network(_) => (
            "NETWORK_ERROR",
            true,
            Some("Check the connection and retry"),
            LogLevel::Warn,
        ),
        AppError::Conversion(_) => (
            "CONVERSION_ERROR",
            false,
            Some("Exclude the file or export it as JPEG"),
            LogLevel::Warn,
        ),
        AppError::MissingSlot(_) => (
            "MISSING_PRESIGNED_SLOT",
            false,
            Some("Retry the whole upload"),
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            "STORAGE_ERROR",
            false,
            Some("Retry the whole upload"),
            LogLevel::Error,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Fix the configuration"),
            LogLevel::Error,
        ),
        AppError::Io(_) => (
            "IO_ERROR",
            false,
            Some("Check the file path and permissions"),
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            false,
            None,
            LogLevel::Error,
        ),
        AppError::Upload { source, .. } => {
            let (_, recoverable, action, level) = app_error_static_metadata(source);
            ("UPLOAD_FAILED", recoverable, action, level)
        }
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Api { status, .. } => format!("Server rejected the request ({})", status),
            AppError::Network(_) => "Could not reach the server".to_string(),
            AppError::Conversion(ref msg) => msg.clone(),
            AppError::MissingSlot(ref name) => {
                format!("The server did not return an upload URL for {}", name)
            }
            AppError::Storage(_) => "Failed to store the picture".to_string(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Io(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
            AppError::Upload { step, file, source } => match file {
                Some(file) => format!(
                    "Upload failed at {} ({}): {}",
                    step,
                    file,
                    source.client_message()
                ),
                None => format!("Upload failed at {}: {}", step, source.client_message()),
            },
        }
    }
}
