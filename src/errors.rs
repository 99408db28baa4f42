//! Application error model with envelope code mapping
//!
//! Defines a typed error hierarchy using `thiserror` for internal error
//! handling, maps each variant to the fixed envelope `errorCode` vocabulary,
//! and hosts the heuristic classifier that turns raw scripting-bridge error
//! text into the taxonomy.

use regex::Regex;
use thiserror::Error;

use crate::bridge::BridgeError;

/// Application error type
///
/// Covers all error cases the Mail automation server may encounter. Each
/// variant carries the complete user-facing message; the envelope builder
/// serializes the variant's [`code`](AppError::code) alongside it.
#[derive(Debug, Error)]
pub enum AppError {
    /// The target application is not launched
    #[error("Mail.app is not running. Please start Mail.app and try again.")]
    NotRunning,
    /// Automation consent was not granted (detected heuristically)
    #[error(
        "Permission denied to access Mail.app. Please grant automation permissions in System Settings > Privacy & Security > Automation."
    )]
    NoPermissions,
    /// Account, mailbox, message, draft, or outgoing-message id absent
    #[error("{0}")]
    NotFound(String),
    /// Missing/malformed required field, malformed embedded JSON, limit out of bounds
    #[error("{0}")]
    InvalidArgument(String),
    /// Anything else, wrapping the underlying message text
    #[error("{0}")]
    Unknown(String),
}

/// Error text fragments that indicate a denied automation consent
///
/// Matching is case-insensitive and best-effort: the scripting bridge
/// reports permission failures only as free text, so misclassification is
/// possible and callers should treat the resulting code as a hint.
const PERMISSION_PATTERNS: &[&str] = &[
    "automation is not allowed",
    "not authorized to send apple events",
    "not allowed to send apple events",
    "not allowed assistive access",
];

/// Error text fragments that indicate the application is not launched
const NOT_RUNNING_PATTERNS: &[&str] = &[
    "application isn't running",
    "application is not running",
    "can't get application",
];

/// OSA error numbers mapped to the taxonomy
///
/// -1743 (event not permitted) and -1744 (user consent required) are the
/// automation-consent failures; -600 is "application isn't running."
const PERMISSION_OSA_CODES: &[i64] = &[-1743, -1744];
const NOT_RUNNING_OSA_CODES: &[i64] = &[-600];

impl AppError {
    /// Convenience constructor for `InvalidArgument`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Convenience constructor for `NotFound`
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Envelope `errorCode` for this variant
    ///
    /// The vocabulary is fixed; clients branch on these strings rather than
    /// parsing message text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRunning => "MAIL_APP_NOT_RUNNING",
            Self::NoPermissions => "MAIL_APP_NO_PERMISSIONS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Classify a raw bridge error message into the taxonomy
    ///
    /// Applies the pattern tables above: permission phrases and OSA error
    /// numbers first, then not-running indicators, otherwise `Unknown`
    /// wrapping the original text. Best-effort by design.
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if PERMISSION_PATTERNS.iter().any(|p| lowered.contains(p)) {
            return Self::NoPermissions;
        }
        if NOT_RUNNING_PATTERNS.iter().any(|p| lowered.contains(p)) {
            return Self::NotRunning;
        }
        if let Some(code) = extract_osa_code(message) {
            if PERMISSION_OSA_CODES.contains(&code) {
                return Self::NoPermissions;
            }
            if NOT_RUNNING_OSA_CODES.contains(&code) {
                return Self::NotRunning;
            }
        }
        Self::Unknown(message.to_owned())
    }
}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        Self::classify(&err.to_string())
    }
}

/// Extract a negative OSA error number from free text (e.g. "(-1743)")
fn extract_osa_code(message: &str) -> Option<i64> {
    let re = Regex::new(r"\((-\d{3,5})\)|error number (-\d{3,5})").ok()?;
    let caps = re.captures(message)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn classifies_permission_phrases() {
        let err = AppError::classify("Error: Not authorized to send Apple events to Mail.");
        assert!(matches!(err, AppError::NoPermissions));
        assert_eq!(err.code(), "MAIL_APP_NO_PERMISSIONS");
    }

    #[test]
    fn classifies_permission_osa_code() {
        let err = AppError::classify("Mail got an error (-1743)");
        assert!(matches!(err, AppError::NoPermissions));
    }

    #[test]
    fn classifies_not_running_phrase() {
        let err = AppError::classify("Mail.app: Application isn't running.");
        assert!(matches!(err, AppError::NotRunning));
        assert_eq!(err.code(), "MAIL_APP_NOT_RUNNING");
    }

    #[test]
    fn classifies_not_running_osa_code() {
        let err = AppError::classify("execution error: an error occurred (-600)");
        assert!(matches!(err, AppError::NotRunning));
    }

    #[test]
    fn unmatched_text_becomes_unknown_and_keeps_message() {
        let err = AppError::classify("something exploded");
        assert!(matches!(err, AppError::Unknown(_)));
        assert_eq!(err.to_string(), "something exploded");
        assert_eq!(err.code(), "UNKNOWN");
    }

    #[test]
    fn not_running_message_names_the_application() {
        assert!(AppError::NotRunning.to_string().contains("Mail.app is not running"));
    }
}
