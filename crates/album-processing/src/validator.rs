//! File validation
//!
//! Checks run in a fixed order: existence, type, size, signature. Each check yields a
//! [`CheckResult`]; the file's verdict is derived from all of them with
//! [`overall_verdict`]. Validation never errors: problems are reported as data so a
//! batch can continue past bad files.

use album_core::mime;
use album_core::models::{
    overall_verdict, BatchValidationSummary, CheckKind, CheckResult, FileValidationResult,
    ReasonCode, UploadCandidate, ValidationProgress, Verdict,
};
use album_core::ValidationConfig;

/// Picture file validator
///
/// Stateless apart from its configuration; a single instance can validate any number
/// of files.
#[derive(Clone, Debug)]
pub struct FileValidator {
    config: ValidationConfig,
}

impl FileValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate that a candidate is present and usable as a file.
    pub fn validate_file_exists(&self, candidate: Option<&UploadCandidate>) -> CheckResult {
        match candidate {
            None => CheckResult::annotated(
                CheckKind::Existence,
                true,
                Verdict::Fail,
                ReasonCode::FileMissing,
                "No file was provided",
            ),
            Some(c) if c.name.trim().is_empty() => CheckResult::annotated(
                CheckKind::Existence,
                true,
                Verdict::Fail,
                ReasonCode::InvalidFile,
                "File has no name",
            ),
            Some(_) => CheckResult::pass(CheckKind::Existence, true),
        }
    }

    /// Validate the declared content type and extension against the allow-lists.
    ///
    /// HEIC/HEIF files always pass, annotated for conversion. When only one of
    /// content type and extension is allowed, or both are allowed but disagree with
    /// each other, the result is a warning.
    pub fn validate_file_type(&self, candidate: &UploadCandidate) -> CheckResult {
        if candidate.is_heic() {
            return CheckResult::annotated(
                CheckKind::Type,
                true,
                Verdict::Pass,
                ReasonCode::HeicConversionRequired,
                format!("{} is HEIC/HEIF and will be converted", candidate.name),
            );
        }

        let content_type = candidate.content_type.trim().to_lowercase();
        let extension = candidate.extension().unwrap_or_default();

        let type_allowed = self
            .config
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&content_type));
        let extension_allowed = !extension.is_empty()
            && self
                .config
                .allowed_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&extension));

        match (type_allowed, extension_allowed) {
            (true, true) => {
                let expected = mime::content_types_for_extension(&extension);
                if !expected.is_empty() && !expected.contains(&content_type.as_str()) {
                    tracing::debug!(
                        extension = %extension,
                        content_type = %content_type,
                        "Content type does not match extension"
                    );
                    return CheckResult::annotated(
                        CheckKind::Type,
                        true,
                        Verdict::Warning,
                        ReasonCode::TypeMismatch,
                        format!(
                            "Content type {} does not match extension .{} (expected {})",
                            content_type,
                            extension,
                            expected.join(", ")
                        ),
                    );
                }
                CheckResult::pass(CheckKind::Type, true)
            }
            (true, false) => CheckResult::annotated(
                CheckKind::Type,
                true,
                Verdict::Warning,
                ReasonCode::TypeMismatch,
                format!(
                    "Content type {} is allowed but extension '{}' is not",
                    content_type, extension
                ),
            ),
            (false, true) => CheckResult::annotated(
                CheckKind::Type,
                true,
                Verdict::Warning,
                ReasonCode::TypeMismatch,
                format!(
                    "Extension .{} is allowed but content type '{}' is not",
                    extension, content_type
                ),
            ),
            (false, false) => CheckResult::annotated(
                CheckKind::Type,
                true,
                Verdict::Fail,
                ReasonCode::InvalidType,
                format!(
                    "Unsupported file type {} (allowed: {})",
                    if content_type.is_empty() {
                        "<none>"
                    } else {
                        content_type.as_str()
                    },
                    self.config.allowed_types.join(", ")
                ),
            ),
        }
    }

    /// Validate file size against the configured bounds.
    pub fn validate_file_size(&self, size: u64) -> CheckResult {
        if size < self.config.min_size {
            return CheckResult::annotated(
                CheckKind::Size,
                true,
                Verdict::Fail,
                ReasonCode::FileTooSmall,
                format!(
                    "File too small: {} bytes (min: {} bytes)",
                    size, self.config.min_size
                ),
            );
        }

        if size > self.config.max_size {
            return CheckResult::annotated(
                CheckKind::Size,
                true,
                Verdict::Fail,
                ReasonCode::FileTooLarge,
                format!(
                    "File too large: {} bytes (max: {} bytes)",
                    size, self.config.max_size
                ),
            );
        }

        if size > self.config.large_file_threshold() {
            return CheckResult::annotated(
                CheckKind::Size,
                true,
                Verdict::Warning,
                ReasonCode::LargeFile,
                format!(
                    "Large file: {} bytes, upload may be slow (max: {} bytes)",
                    size, self.config.max_size
                ),
            );
        }

        CheckResult::pass(CheckKind::Size, true)
    }

    /// Compare the file's leading bytes with its declared type.
    ///
    /// Not required: a mismatch can only warn.
    pub fn validate_signature(&self, candidate: &UploadCandidate) -> CheckResult {
        let Some(detected) = mime::sniff_content_type(&candidate.data) else {
            return CheckResult::annotated(
                CheckKind::Signature,
                false,
                Verdict::Warning,
                ReasonCode::UnrecognizedSignature,
                "File content does not look like a known image format",
            );
        };

        let declared = candidate.content_type.trim().to_lowercase();
        let by_extension = candidate
            .extension()
            .map(|ext| mime::content_types_for_extension(&ext))
            .unwrap_or_default();

        let consistent = declared == detected
            || by_extension.contains(&detected)
            || (candidate.is_heic() && mime::HEIC_CONTENT_TYPES.contains(&detected));

        if consistent {
            CheckResult::pass(CheckKind::Signature, false)
        } else {
            CheckResult::annotated(
                CheckKind::Signature,
                false,
                Verdict::Warning,
                ReasonCode::SignatureMismatch,
                format!(
                    "File content looks like {} but was declared as {}",
                    detected,
                    if declared.is_empty() {
                        "<none>"
                    } else {
                        declared.as_str()
                    }
                ),
            )
        }
    }

    /// Run every check over one candidate.
    pub fn validate(&self, candidate: Option<&UploadCandidate>) -> FileValidationResult {
        let existence = self.validate_file_exists(candidate);
        let mut checks = vec![existence];

        let candidate = match candidate {
            Some(c) if !checks[0].is_required_failure() => c,
            _ => return Self::finish(candidate, checks),
        };

        let stop_on_first_failure = self.config.stop_on_first_failure;
        let type_check = self.validate_file_type(candidate);
        let failed = type_check.is_required_failure();
        checks.push(type_check);
        if failed && stop_on_first_failure {
            return Self::finish(Some(candidate), checks);
        }

        let size_check = self.validate_file_size(candidate.size());
        let failed = size_check.is_required_failure();
        checks.push(size_check);
        if failed && stop_on_first_failure {
            return Self::finish(Some(candidate), checks);
        }

        if self.config.check_signature && !candidate.data.is_empty() {
            checks.push(self.validate_signature(candidate));
        }

        Self::finish(Some(candidate), checks)
    }

    /// Validate every candidate in order, reporting progress after each file.
    pub fn validate_batch<F>(
        &self,
        candidates: &[UploadCandidate],
        on_progress: F,
    ) -> BatchValidationSummary
    where
        F: FnMut(ValidationProgress<'_>),
    {
        self.validate_all(candidates.iter().map(Some), candidates.len(), on_progress)
    }

    /// Like [`validate_batch`](Self::validate_batch), for batches where some files
    /// could not be provided. A `None` entry fails the existence check with
    /// `FILE_MISSING` and the batch carries on.
    pub fn validate_entries<F>(
        &self,
        entries: &[Option<UploadCandidate>],
        on_progress: F,
    ) -> BatchValidationSummary
    where
        F: FnMut(ValidationProgress<'_>),
    {
        self.validate_all(entries.iter().map(Option::as_ref), entries.len(), on_progress)
    }

    fn validate_all<'a, I, F>(
        &self,
        entries: I,
        total: usize,
        mut on_progress: F,
    ) -> BatchValidationSummary
    where
        I: Iterator<Item = Option<&'a UploadCandidate>>,
        F: FnMut(ValidationProgress<'_>),
    {
        let mut summary = BatchValidationSummary::default();

        for (index, candidate) in entries.enumerate() {
            let result = self.validate(candidate);

            tracing::debug!(
                file = candidate.map(|c| c.name.as_str()).unwrap_or("<missing>"),
                verdict = ?result.verdict,
                needs_conversion = result.needs_conversion,
                "File validated"
            );

            on_progress(ValidationProgress {
                current: index + 1,
                total,
                result: &result,
            });
            summary.record(result);
        }

        tracing::info!(
            total = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            warned = summary.warned,
            "Batch validation completed"
        );

        summary
    }

    fn finish(candidate: Option<&UploadCandidate>, checks: Vec<CheckResult>) -> FileValidationResult {
        let verdict = overall_verdict(&checks);
        let needs_conversion = verdict != Verdict::Fail
            && checks
                .iter()
                .any(|c| c.code == Some(ReasonCode::HeicConversionRequired));

        FileValidationResult {
            candidate_id: candidate.map(|c| c.id),
            file_name: candidate.map(|c| c.name.clone()),
            verdict,
            checks,
            needs_conversion,
        }
    }
}
