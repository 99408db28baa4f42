//! Message Query Engine: bulk fetch, scan, paginate
//!
//! Scans one mailbox's message collection against a compound filter. Only
//! the property columns active predicates need are bulk-fetched, because
//! materializing unused properties across thousands of messages is the
//! expensive part of talking to the store. The full matching index list is
//! computed in mailbox order, then the first `limit` entries are
//! materialized into summaries; `total_matches` is reported separately so
//! callers can compute "has more".

use crate::bridge::{BridgeResult, Mailbox, Message, MessageBatch, RecipientField};
use crate::envelope::OpLog;
use crate::errors::{AppError, AppResult};
use crate::filter::{MessageFilter, MessageProps};
use crate::models::MessageSummary;
use crate::resolve::mailbox_path;

/// Inclusive bounds for the `limit` argument of mailbox scans
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 1000;

/// Content preview length in characters
const PREVIEW_CHARS: usize = 100;

/// Result of one mailbox scan
pub struct QueryOutcome {
    /// The first `limit` matching messages, in mailbox order
    pub messages: Vec<MessageSummary>,
    /// Number of matches before the limit was applied
    pub total_matches: usize,
}

/// Validate a scan limit, rejecting out-of-range values
///
/// Never clamps: a caller asking for 0 or 10000 gets an error before any
/// store access happens.
pub fn validate_limit(limit: i64) -> AppResult<usize> {
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::invalid(format!(
            "Limit must be between {MIN_LIMIT} and {MAX_LIMIT}"
        )));
    }
    Ok(limit as usize)
}

/// Bulk-fetched property columns, populated only for active predicates
#[derive(Default)]
struct Columns {
    subjects: Option<Vec<Option<String>>>,
    senders: Option<Vec<Option<String>>>,
    read_statuses: Option<Vec<bool>>,
    flagged_statuses: Option<Vec<bool>>,
    dates_received: Option<Vec<Option<chrono::DateTime<chrono::Utc>>>>,
}

impl Columns {
    fn fetch(batch: &dyn MessageBatch, filter: &MessageFilter) -> BridgeResult<Self> {
        let mut columns = Self::default();
        if filter.wants_subjects() {
            columns.subjects = Some(batch.subjects()?);
        }
        if filter.wants_senders() {
            columns.senders = Some(batch.senders()?);
        }
        if filter.wants_read_statuses() {
            columns.read_statuses = Some(batch.read_statuses()?);
        }
        if filter.wants_flagged_statuses() {
            columns.flagged_statuses = Some(batch.flagged_statuses()?);
        }
        if filter.wants_dates() {
            columns.dates_received = Some(batch.dates_received()?);
        }
        Ok(columns)
    }

    /// Number of messages, taken from any fetched column
    ///
    /// `None` when no column was fetched (empty filter), in which case the
    /// caller asks the batch directly.
    fn len(&self) -> Option<usize> {
        self.subjects
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.senders.as_ref().map(Vec::len))
            .or_else(|| self.read_statuses.as_ref().map(Vec::len))
            .or_else(|| self.flagged_statuses.as_ref().map(Vec::len))
            .or_else(|| self.dates_received.as_ref().map(Vec::len))
    }

    fn props_at(&self, index: usize) -> MessageProps<'_> {
        MessageProps {
            subject: self
                .subjects
                .as_ref()
                .and_then(|c| c.get(index))
                .and_then(|s| s.as_deref()),
            sender: self
                .senders
                .as_ref()
                .and_then(|c| c.get(index))
                .and_then(|s| s.as_deref()),
            read_status: self.read_statuses.as_ref().and_then(|c| c.get(index)).copied(),
            flagged: self
                .flagged_statuses
                .as_ref()
                .and_then(|c| c.get(index))
                .copied(),
            date_received: self
                .dates_received
                .as_ref()
                .and_then(|c| c.get(index))
                .copied()
                .flatten(),
        }
    }
}

/// Scan `mailbox` against `filter`, returning the first `limit` matches
///
/// Matching preserves mailbox order; no re-sorting happens anywhere. A
/// message whose property reads fail during materialization is skipped with
/// a diagnostic; the batch never aborts for one bad message.
pub fn query_messages(
    mailbox: &dyn Mailbox,
    account_name: &str,
    requested_path: &[String],
    filter: &MessageFilter,
    limit: usize,
    log: &mut OpLog,
) -> AppResult<QueryOutcome> {
    let batch = mailbox.messages()?;
    let columns = Columns::fetch(batch.as_ref(), filter)?;
    let total_messages = match columns.len() {
        Some(len) => len,
        None => batch.len()?,
    };

    let matching: Vec<usize> = (0..total_messages)
        .filter(|&i| filter.matches(&columns.props_at(i)))
        .collect();
    let total_matches = matching.len();
    log.push(format!("Found {total_matches} matching messages"));

    let mut messages = Vec::with_capacity(total_matches.min(limit));
    for &index in matching.iter().take(limit) {
        match batch
            .message_at(index)
            .and_then(|msg| summarize(msg.as_ref(), account_name, requested_path, log))
        {
            Ok(summary) => messages.push(summary),
            Err(e) => log.push(format!("Error reading message {index}: {e}")),
        }
    }

    Ok(QueryOutcome {
        messages,
        total_matches,
    })
}

/// Materialize one message into a summary
///
/// Core properties propagate failure (the caller skips the message); the
/// display-only fields — content preview, recipient counts, containing
/// mailbox path — degrade individually with a diagnostic instead.
fn summarize(
    msg: &dyn Message,
    account_name: &str,
    requested_path: &[String],
    log: &mut OpLog,
) -> BridgeResult<MessageSummary> {
    let id = msg.id()?;
    let subject = msg.subject()?;
    let sender = msg.sender()?;
    let date_received = msg.date_received()?;
    let date_sent = msg.date_sent()?;
    let read_status = msg.read_status()?;
    let flagged_status = msg.flagged_status()?;
    let message_size = msg.size()?;

    let content = match msg.content() {
        Ok(content) => content,
        Err(e) => {
            log.push(format!("Error reading content for message {id}: {e}"));
            String::new()
        }
    };

    let to_count = recipient_count(msg, RecipientField::To, log);
    let cc_count = recipient_count(msg, RecipientField::Cc, log);

    let message_mailbox_path = match msg.mailbox() {
        Ok(mailbox) => mailbox_path(mailbox.as_ref(), account_name),
        Err(e) => {
            log.push(format!("Error reading mailbox path for message {id}: {e}"));
            requested_path.to_vec()
        }
    };

    Ok(MessageSummary {
        id,
        subject,
        sender,
        date_received,
        date_sent,
        read_status,
        flagged_status,
        message_size,
        content_preview: preview(&content),
        content_length: content.chars().count(),
        to_count,
        cc_count,
        total_recipients: to_count + cc_count,
        mailbox_path: message_mailbox_path,
        account: account_name.to_owned(),
    })
}

fn recipient_count(msg: &dyn Message, field: RecipientField, log: &mut OpLog) -> usize {
    match msg.recipients(field) {
        Ok(addresses) => addresses.len(),
        Err(e) => {
            log.push(format!(
                "Error reading {} recipients count: {e}",
                field.label()
            ));
            0
        }
    }
}

/// First 100 characters of the content, with an ellipsis when truncated
pub(crate) fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let truncated: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        content.to_owned()
    }
}
