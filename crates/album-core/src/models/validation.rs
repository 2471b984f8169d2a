use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of a single check or of a whole file, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Warning,
    Fail,
}

/// Machine-readable reason attached to a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    FileMissing,
    InvalidFile,
    InvalidType,
    TypeMismatch,
    HeicConversionRequired,
    FileTooSmall,
    FileTooLarge,
    LargeFile,
    SignatureMismatch,
    UnrecognizedSignature,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::FileMissing => "FILE_MISSING",
            ReasonCode::InvalidFile => "INVALID_FILE",
            ReasonCode::InvalidType => "INVALID_TYPE",
            ReasonCode::TypeMismatch => "TYPE_MISMATCH",
            ReasonCode::HeicConversionRequired => "HEIC_CONVERSION_REQUIRED",
            ReasonCode::FileTooSmall => "FILE_TOO_SMALL",
            ReasonCode::FileTooLarge => "FILE_TOO_LARGE",
            ReasonCode::LargeFile => "LARGE_FILE",
            ReasonCode::SignatureMismatch => "SIGNATURE_MISMATCH",
            ReasonCode::UnrecognizedSignature => "UNRECOGNIZED_SIGNATURE",
        }
    }
}

/// Which check produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Existence,
    Type,
    Size,
    Signature,
}

/// Result of one check over one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckKind,
    pub verdict: Verdict,
    /// Reason code; `None` for a plain pass
    pub code: Option<ReasonCode>,
    /// Human-readable explanation
    pub message: String,
    /// Required checks decide whether a file fails; optional ones can only warn
    pub required: bool,
}

impl CheckResult {
    pub fn pass(check: CheckKind, required: bool) -> Self {
        Self {
            check,
            verdict: Verdict::Pass,
            code: None,
            message: String::new(),
            required,
        }
    }

    pub fn annotated(
        check: CheckKind,
        required: bool,
        verdict: Verdict,
        code: ReasonCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check,
            verdict,
            code: Some(code),
            message: message.into(),
            required,
        }
    }

    pub fn is_required_failure(&self) -> bool {
        self.required && self.verdict == Verdict::Fail
    }
}

/// Verdict for a whole file from its individual checks.
///
/// `Fail` if any required check fails; `Warning` if no required check fails but a
/// check warns or an optional check fails; otherwise `Pass`.
pub fn overall_verdict(checks: &[CheckResult]) -> Verdict {
    if checks.iter().any(CheckResult::is_required_failure) {
        Verdict::Fail
    } else if checks.iter().any(|c| c.verdict != Verdict::Pass) {
        Verdict::Warning
    } else {
        Verdict::Pass
    }
}

/// Validation result for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidationResult {
    /// `None` when the candidate was absent
    pub candidate_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub verdict: Verdict,
    pub checks: Vec<CheckResult>,
    /// The file is HEIC/HEIF and must go through the converter before upload
    pub needs_conversion: bool,
}

impl FileValidationResult {
    pub fn is_valid(&self) -> bool {
        self.verdict != Verdict::Fail
    }

    pub fn reason_codes(&self) -> impl Iterator<Item = ReasonCode> + '_ {
        self.checks.iter().filter_map(|c| c.code)
    }

    pub fn has_code(&self, code: ReasonCode) -> bool {
        self.reason_codes().any(|c| c == code)
    }
}

/// Progress notification emitted after each file of a batch.
#[derive(Debug, Clone, Copy)]
pub struct ValidationProgress<'a> {
    /// Number of files validated so far (1-based)
    pub current: usize,
    pub total: usize,
    pub result: &'a FileValidationResult,
}

/// Aggregate of a batch validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchValidationSummary {
    pub total: usize,
    /// Files that may proceed (pass or warning)
    pub valid: usize,
    /// Files that failed a required check
    pub invalid: usize,
    /// Files that proceed with at least one warning
    pub warned: usize,
    /// Occurrences of each reason code across the batch
    pub reason_counts: BTreeMap<ReasonCode, usize>,
    /// Per-file results in input order
    pub results: Vec<FileValidationResult>,
}

impl BatchValidationSummary {
    pub fn record(&mut self, result: FileValidationResult) {
        self.total += 1;
        match result.verdict {
            Verdict::Pass => self.valid += 1,
            Verdict::Warning => {
                self.valid += 1;
                self.warned += 1;
            }
            Verdict::Fail => self.invalid += 1,
        }
        for code in result.reason_codes() {
            *self.reason_counts.entry(code).or_insert(0) += 1;
        }
        self.results.push(result);
    }
}
