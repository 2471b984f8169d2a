//! Configuration module
//!
//! This module provides the configuration consumed by the validator, the HEIC
//! converter, the retry helper and the API client. Everything is read from the
//! environment (a `.env` file is honoured) with defaults, then validated.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

// Common constants
const MIN_FILE_SIZE_BYTES: u64 = 1024;
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const LARGE_FILE_WARNING_RATIO: f64 = 0.6;
const HEIC_QUALITY: f32 = 0.8;
const UPLOAD_MAX_RETRIES: u32 = 3;
const UPLOAD_RETRY_BASE_DELAY_MS: u64 = 200;
const UPLOAD_RETRY_MAX_DELAY_MS: u64 = 5000;
const HTTP_TIMEOUT_SECS: u64 = 60;
const TOKEN_REFRESH_SKEW_SECS: i64 = 30;

/// Target types the converter can encode.
pub const SUPPORTED_CONVERSION_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .to_lowercase()
        .parse()
        .unwrap_or(default)
}

/// File validator settings.
#[derive(Clone, Debug)]
pub struct ValidationConfig {
    pub allowed_types: Vec<String>,
    /// Extensions without the leading dot
    pub allowed_extensions: Vec<String>,
    pub min_size: u64,
    pub max_size: u64,
    pub stop_on_first_failure: bool,
    /// Fraction of `max_size` above which an accepted file is flagged as large
    pub large_file_warning_ratio: f64,
    /// Compare the file's magic bytes against its declared type
    pub check_signature: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_types: parse_list("image/jpeg,image/png,image/gif,image/webp"),
            allowed_extensions: parse_list("jpg,jpeg,png,gif,webp"),
            min_size: MIN_FILE_SIZE_BYTES,
            max_size: MAX_FILE_SIZE_BYTES,
            stop_on_first_failure: false,
            large_file_warning_ratio: LARGE_FILE_WARNING_RATIO,
            check_signature: true,
        }
    }
}

impl ValidationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            allowed_types: env::var("ALLOWED_CONTENT_TYPES")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.allowed_types),
            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.allowed_extensions),
            min_size: env::var("MIN_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| MIN_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MIN_FILE_SIZE_BYTES),
            max_size: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            stop_on_first_failure: env_bool("STOP_ON_FIRST_FAILURE", false),
            large_file_warning_ratio: env::var("LARGE_FILE_WARNING_RATIO")
                .unwrap_or_else(|_| LARGE_FILE_WARNING_RATIO.to_string())
                .parse()
                .unwrap_or(LARGE_FILE_WARNING_RATIO),
            check_signature: env_bool("CHECK_FILE_SIGNATURE", true),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_size > self.max_size {
            return Err(AppError::Config(format!(
                "MIN_FILE_SIZE_BYTES ({}) must not exceed MAX_FILE_SIZE_BYTES ({})",
                self.min_size, self.max_size
            )));
        }
        if !(0.0..=1.0).contains(&self.large_file_warning_ratio) {
            return Err(AppError::Config(
                "LARGE_FILE_WARNING_RATIO must be between 0 and 1".to_string(),
            ));
        }
        if self.allowed_types.is_empty() && self.allowed_extensions.is_empty() {
            return Err(AppError::Config(
                "ALLOWED_CONTENT_TYPES and ALLOWED_EXTENSIONS cannot both be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Size above which a file is accepted with a warning.
    pub fn large_file_threshold(&self) -> u64 {
        (self.max_size as f64 * self.large_file_warning_ratio) as u64
    }
}

/// HEIC converter settings.
#[derive(Clone, Debug)]
pub struct ConversionConfig {
    /// Target MIME type
    pub to_type: String,
    /// Quality factor in `(0, 1]`
    pub quality: f32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            to_type: "image/jpeg".to_string(),
            quality: HEIC_QUALITY,
        }
    }
}

impl ConversionConfig {
    pub fn from_env() -> Self {
        Self {
            to_type: env::var("HEIC_TARGET_TYPE")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_else(|_| "image/jpeg".to_string()),
            quality: env::var("HEIC_QUALITY")
                .unwrap_or_else(|_| HEIC_QUALITY.to_string())
                .parse()
                .unwrap_or(HEIC_QUALITY),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !SUPPORTED_CONVERSION_TYPES.contains(&self.to_type.as_str()) {
            return Err(AppError::Config(format!(
                "HEIC_TARGET_TYPE must be one of: {}",
                SUPPORTED_CONVERSION_TYPES.join(", ")
            )));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(AppError::Config(
                "HEIC_QUALITY must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Quality mapped onto the 1-100 scale used by JPEG encoders.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Bounded retry with exponential backoff for transient network failures.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: UPLOAD_MAX_RETRIES,
            base_delay: Duration::from_millis(UPLOAD_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(UPLOAD_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn from_env() -> Self {
        Self {
            max_retries: env::var("UPLOAD_MAX_RETRIES")
                .unwrap_or_else(|_| UPLOAD_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(UPLOAD_MAX_RETRIES),
            base_delay: Duration::from_millis(
                env::var("UPLOAD_RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| UPLOAD_RETRY_BASE_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_RETRY_BASE_DELAY_MS),
            ),
            max_delay: Duration::from_millis(
                env::var("UPLOAD_RETRY_MAX_DELAY_MS")
                    .unwrap_or_else(|_| UPLOAD_RETRY_MAX_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_RETRY_MAX_DELAY_MS),
            ),
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What the orchestrator does when the backend returns no slot for a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingSlotPolicy {
    /// Fail the whole batch before any byte is uploaded
    #[default]
    Abort,
    /// Log, skip the file and report it in the outcome
    Skip,
}

impl MissingSlotPolicy {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(MissingSlotPolicy::Abort),
            "skip" => Ok(MissingSlotPolicy::Skip),
            other => Err(AppError::Config(format!(
                "Invalid MISSING_SLOT_POLICY: {} (expected abort or skip)",
                other
            ))),
        }
    }
}

/// API client settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_version: String,
    pub timeout: Duration,
    /// File holding the persisted refresh token
    pub token_store_path: PathBuf,
    /// Access tokens this close to expiry are treated as expired
    pub refresh_skew: chrono::Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_version: "v1".to_string(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            token_store_path: PathBuf::from(".album/credentials.json"),
            refresh_skew: chrono::Duration::seconds(TOKEN_REFRESH_SKEW_SECS),
        }
    }
}

fn refresh_skew_from_secs(secs: i64) -> Result<chrono::Duration, AppError> {
    chrono::Duration::try_seconds(secs).ok_or_else(|| {
        AppError::Config(format!("TOKEN_REFRESH_SKEW_SECS is out of range: {}", secs))
    })
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            api_url: env::var("ALBUM_API_URL")
                .or_else(|_| env::var("API_URL"))
                .unwrap_or(defaults.api_url),
            api_version: env::var("ALBUM_API_VERSION").unwrap_or(defaults.api_version),
            timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(HTTP_TIMEOUT_SECS),
            ),
            token_store_path: env::var("TOKEN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_store_path),
            refresh_skew: refresh_skew_from_secs(
                env::var("TOKEN_REFRESH_SKEW_SECS")
                    .unwrap_or_else(|_| TOKEN_REFRESH_SKEW_SECS.to_string())
                    .parse()
                    .unwrap_or(TOKEN_REFRESH_SKEW_SECS),
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(AppError::Config(
                "ALBUM_API_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.api_version.trim().is_empty() {
            return Err(AppError::Config(
                "ALBUM_API_VERSION cannot be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AppError::Config(
                "HTTP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if self.refresh_skew < chrono::Duration::zero() {
            return Err(AppError::Config(
                "TOKEN_REFRESH_SKEW_SECS cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// API path prefix, e.g. `/api/v1`.
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version.trim_matches('/'))
    }
}

/// Complete configuration of the ingestion pipeline.
#[derive(Clone, Debug, Default)]
pub struct IngestConfig {
    pub validation: ValidationConfig,
    pub conversion: ConversionConfig,
    pub retry: RetryPolicy,
    pub client: ClientConfig,
    pub missing_slot_policy: MissingSlotPolicy,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let missing_slot_policy = match env::var("MISSING_SLOT_POLICY") {
            Ok(value) => MissingSlotPolicy::parse(&value)?,
            Err(_) => MissingSlotPolicy::default(),
        };

        let config = IngestConfig {
            validation: ValidationConfig::from_env(),
            conversion: ConversionConfig::from_env(),
            retry: RetryPolicy::from_env(),
            client: ClientConfig::from_env()?,
            missing_slot_policy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.validation.validate()?;
        self.conversion.validate()?;
        self.client.validate()?;
        Ok(())
    }
}
