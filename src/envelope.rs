//! Uniform result envelope and per-operation diagnostic log
//!
//! Every operation resolves to the same envelope shape regardless of
//! outcome: `success` plus either `data` or `error`/`errorCode`, with an
//! optional newline-joined diagnostic trace in `logs`. Failures are carried
//! inside the envelope; they never escape the operation boundary as
//! transport errors.

use schemars::JsonSchema;
use serde::Serialize;

use crate::errors::AppError;

/// Standard result envelope for all operations
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Envelope<T>
where
    T: JsonSchema,
{
    /// Whether the operation succeeded
    pub success: bool,
    /// Operation-specific payload, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable error message, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fixed-vocabulary error code, present on failure
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Newline-joined diagnostic trace accumulated during the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl<T> Envelope<T>
where
    T: JsonSchema,
{
    /// Success envelope wrapping the operation payload
    pub fn ok(data: T, log: OpLog) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
            logs: log.into_logs(),
        }
    }

    /// Failure envelope carrying the error message and code
    pub fn fail(err: &AppError, log: OpLog) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            error_code: Some(err.code().to_owned()),
            logs: log.into_logs(),
        }
    }
}

/// Diagnostic trace collector for one operation
///
/// Operations push human-readable entries as they progress (fallback taken,
/// item skipped, partial read degraded). The entries become the envelope's
/// `logs` field, newline-joined, or are omitted entirely when empty.
#[derive(Debug, Default)]
pub struct OpLog {
    entries: Vec<String>,
}

impl OpLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic entry
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Number of entries recorded so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the log into the envelope `logs` value
    ///
    /// Returns `None` when nothing was recorded so quiet operations omit the
    /// field instead of emitting an empty string.
    pub fn into_logs(self) -> Option<String> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.join("\n"))
        }
    }
}
