//! Input hygiene for resume / job description text.
//!
//! Text that looks like it carries secrets is rejected outright rather than
//! redacted; everything else is only trimmed.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{AppError, FORBIDDEN_CONTENT_DETAIL};

/// Minimum character count for resume and job description after sanitization.
pub const MIN_TEXT_CHARS: usize = 200;

const FORBIDDEN_PATTERN: &str = r"(?i)(password|ssn|social\s*security|credit\s*card|api\s*key)";

fn forbidden_markers() -> &'static Regex {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    FORBIDDEN.get_or_init(|| Regex::new(FORBIDDEN_PATTERN).expect("forbidden-marker pattern is valid"))
}

/// Returns the trimmed text, or a validation error if it contains a
/// forbidden marker anywhere (any case).
pub fn sanitize(text: &str) -> Result<String, AppError> {
    if forbidden_markers().is_match(text) {
        return Err(AppError::Validation(FORBIDDEN_CONTENT_DETAIL.to_string()));
    }
    Ok(text.trim().to_string())
}

/// Checks length in characters, not bytes.
pub fn validate_min_length(text: &str, min_len: usize) -> Result<(), AppError> {
    if text.chars().count() < min_len {
        return Err(AppError::Validation(format!(
            "Resume and job description must be at least {min_len} characters after sanitization."
        )));
    }
    Ok(())
}
