//! Compound message filter and its pure evaluator
//!
//! A filter is a set of optional predicates combined with logical AND:
//! case-insensitive substring on subject and sender, exact read status,
//! flagged-only, and exclusive date bounds on the receive date. Evaluation
//! is a pure function over one message's materialized properties with no
//! I/O; it short-circuits on the first failing predicate, which is safe
//! because predicates are independent and side-effect-free.

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::{AppError, AppResult};

/// Compound filter over message properties
///
/// All predicates are optional; an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Case-insensitive substring required in the subject
    pub subject: Option<String>,
    /// Case-insensitive substring required in the sender string
    pub sender: Option<String>,
    /// Exact read-status required
    pub read_status: Option<bool>,
    /// Require the flagged status to be strictly true
    pub flagged_only: bool,
    /// Receive date must be strictly after this instant
    pub date_after: Option<DateTime<Utc>>,
    /// Receive date must be strictly before this instant
    pub date_before: Option<DateTime<Utc>>,
}

/// One message's materialized properties, as far as the active filter
/// needed them fetched
///
/// Fields the filter does not inspect are simply left `None` by the query
/// engine; a `None` on an inspected field means the store had no value, and
/// the predicate then fails for that message.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageProps<'a> {
    pub subject: Option<&'a str>,
    pub sender: Option<&'a str>,
    pub read_status: Option<bool>,
    pub flagged: Option<bool>,
    pub date_received: Option<DateTime<Utc>>,
}

impl MessageFilter {
    /// Whether no predicate is active
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.sender.is_none()
            && self.read_status.is_none()
            && !self.flagged_only
            && self.date_after.is_none()
            && self.date_before.is_none()
    }

    pub fn wants_subjects(&self) -> bool {
        self.subject.is_some()
    }

    pub fn wants_senders(&self) -> bool {
        self.sender.is_some()
    }

    pub fn wants_read_statuses(&self) -> bool {
        self.read_status.is_some()
    }

    pub fn wants_flagged_statuses(&self) -> bool {
        self.flagged_only
    }

    pub fn wants_dates(&self) -> bool {
        self.date_after.is_some() || self.date_before.is_some()
    }

    /// Evaluate every active predicate against one message
    ///
    /// Returns true iff all active predicates hold. Result is independent
    /// of evaluation order.
    pub fn matches(&self, props: &MessageProps<'_>) -> bool {
        if let Some(needle) = &self.subject {
            let Some(subject) = props.subject else {
                return false;
            };
            if !contains_ci(subject, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.sender {
            let Some(sender) = props.sender else {
                return false;
            };
            if !contains_ci(sender, needle) {
                return false;
            }
        }
        if let Some(expected) = self.read_status {
            if props.read_status != Some(expected) {
                return false;
            }
        }
        if self.flagged_only && props.flagged != Some(true) {
            return false;
        }
        if let Some(after) = self.date_after {
            let Some(received) = props.date_received else {
                return false;
            };
            if received <= after {
                return false;
            }
        }
        if let Some(before) = self.date_before {
            let Some(received) = props.date_received else {
                return false;
            };
            if received >= before {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive substring containment
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parse a date filter argument
///
/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as
/// midnight UTC). Rejects anything else before the scan starts.
pub fn parse_date_arg(value: &str, field: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(AppError::invalid(format!(
        "Invalid {field} '{value}': expected an RFC 3339 timestamp or YYYY-MM-DD"
    )))
}
