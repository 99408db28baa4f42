//! Input/output DTOs and schema-bearing types
//!
//! Defines the data structures of every MCP tool contract. Each type is
//! annotated with `JsonSchema` for automatic schema generation. Response
//! field names follow the snake_case vocabulary of the operation surface
//! (`total_matches`, `has_more`, `outgoing_id`, ...).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, OutgoingId};

// ---------------------------------------------------------------------------
// Tool inputs
// ---------------------------------------------------------------------------

/// Input: list accounts
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListAccountsInput {
    /// Only include enabled accounts
    #[serde(default)]
    pub filter_enabled: bool,
}

/// Input: account name only
///
/// Used by `list_mailboxes` and `find_unread_mailboxes`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AccountInput {
    /// Name of the email account
    pub account: String,
}

/// Input: find messages in one mailbox
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindMessagesInput {
    /// Name of the email account
    pub account: String,
    /// Mailbox path from the account root, e.g. `["Inbox", "GitHub"]`
    pub mailbox_path: Vec<String>,
    /// Case-insensitive substring required in the subject
    pub subject: Option<String>,
    /// Case-insensitive substring required in the sender
    pub sender: Option<String>,
    /// Exact read status
    pub read_status: Option<bool>,
    /// Only flagged messages
    #[serde(default)]
    pub flagged_only: bool,
    /// Only messages received strictly after this instant (RFC 3339 or YYYY-MM-DD)
    pub date_after: Option<String>,
    /// Only messages received strictly before this instant (RFC 3339 or YYYY-MM-DD)
    pub date_before: Option<String>,
    /// Maximum messages to return (1..1000, default 50)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Input: get one message's full content
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetMessageContentInput {
    /// Name of the email account
    pub account: String,
    /// Mailbox path from the account root
    pub mailbox_path: Vec<String>,
    /// The id of the message to retrieve
    pub message_id: MessageId,
}

/// Input: list drafts of one account
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListDraftsInput {
    /// Name of the email account
    pub account: String,
    /// Maximum drafts to return (1..1000, default 50)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Input: messages selected in the frontmost viewer window
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSelectedMessagesInput {
    /// Maximum messages to return (1..100, default 10)
    #[serde(default = "default_selected_limit")]
    pub limit: i64,
    /// Zero-based offset into the selection (default 0)
    #[serde(default)]
    pub start_at: i64,
}

/// Input: create an outgoing message
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateOutgoingMessageInput {
    /// Message subject (must be non-empty after trimming)
    pub subject: String,
    /// Plain-text message body
    pub content: String,
    /// To recipient addresses
    #[serde(default)]
    pub to: Vec<String>,
    /// CC recipient addresses
    #[serde(default)]
    pub cc: Vec<String>,
    /// BCC recipient addresses
    #[serde(default)]
    pub bcc: Vec<String>,
    /// Sender identity, e.g. `"Jane Doe <jane@example.com>"`; the application
    /// default is used when absent
    pub sender: Option<String>,
    /// Show the compose window instead of keeping it hidden
    #[serde(default)]
    pub opening_window: bool,
}

/// Omitted-field policy for replace
///
/// `keep_existing` treats omitted or empty fields as "keep the old value";
/// `require_sentinel` takes every provided value literally and preserves a
/// field only when it carries the `__KEEP__` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OmittedFields {
    #[default]
    KeepExisting,
    RequireSentinel,
}

/// Input: replace an outgoing message (delete + recreate)
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReplaceOutgoingMessageInput {
    /// Id of the outgoing message to replace
    pub outgoing_id: OutgoingId,
    /// New subject; `"__KEEP__"` preserves the existing one
    pub subject: Option<String>,
    /// New content; `"__KEEP__"` preserves the existing one
    pub content: Option<String>,
    /// New To list; `["__KEEP__"]` preserves the existing one
    pub to: Option<Vec<String>>,
    /// New CC list; `["__KEEP__"]` preserves the existing one
    pub cc: Option<Vec<String>>,
    /// New BCC list; `["__KEEP__"]` preserves the existing one
    pub bcc: Option<Vec<String>>,
    /// New sender; `"__KEEP__"` preserves the existing one
    pub sender: Option<String>,
    /// Show the recreated compose window
    #[serde(default)]
    pub opening_window: bool,
    /// How omitted fields are resolved (default `keep_existing`)
    #[serde(default)]
    pub omitted_fields: OmittedFields,
}

/// Input: delete an open outgoing message
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteOutgoingMessageInput {
    /// Id of the outgoing message to delete
    pub outgoing_id: OutgoingId,
}

/// Input: delete a saved draft
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteDraftInput {
    /// Id of the draft to delete
    pub draft_id: MessageId,
}

/// Input: reply to a message
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReplyToMessageInput {
    /// Name of the email account
    pub account: String,
    /// Mailbox path of the original message
    pub mailbox_path: Vec<String>,
    /// Id of the message to reply to
    pub message_id: MessageId,
    /// Plain-text reply body
    pub reply_content: String,
    /// Also copy the original CC recipients onto the reply
    #[serde(default)]
    pub reply_to_all: bool,
    /// Show the compose window instead of keeping it hidden
    #[serde(default)]
    pub opening_window: bool,
}

/// Default value for `limit` in message/draft listings
fn default_limit() -> i64 {
    50
}

/// Default value for `limit` in get_selected_messages
fn default_selected_limit() -> i64 {
    10
}

// ---------------------------------------------------------------------------
// Tool outputs
// ---------------------------------------------------------------------------

/// One configured account
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AccountInfo {
    /// Account display name
    pub name: String,
    /// Whether the account is enabled
    pub enabled: bool,
    /// Configured addresses (best-effort; empty for account types that do
    /// not expose them)
    pub email_addresses: Vec<String>,
    /// Number of mailboxes (best-effort)
    pub mailbox_count: usize,
}

/// Data for `list_accounts`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AccountListData {
    pub accounts: Vec<AccountInfo>,
    pub count: usize,
}

/// One mailbox in a flat account listing
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MailboxInfo {
    pub name: String,
    pub account: String,
    pub unread_count: i64,
}

/// Data for `list_mailboxes`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MailboxListData {
    pub mailboxes: Vec<MailboxInfo>,
    pub count: usize,
}

/// One mailbox holding unread messages
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UnreadMailboxInfo {
    pub name: String,
    /// Full path from the account root
    pub path: Vec<String>,
    pub unread_count: i64,
}

/// Data for `find_unread_mailboxes`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UnreadMailboxesData {
    pub mailboxes: Vec<UnreadMailboxInfo>,
    pub count: usize,
}

/// Message summary returned by `find_messages`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MessageSummary {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date_received: DateTime<Utc>,
    pub date_sent: Option<DateTime<Utc>>,
    pub read_status: bool,
    pub flagged_status: bool,
    pub message_size: i64,
    /// First 100 characters of the content, with an ellipsis when truncated
    pub content_preview: String,
    pub content_length: usize,
    pub to_count: usize,
    pub cc_count: usize,
    pub total_recipients: usize,
    /// Path of the containing mailbox (may differ from the queried path for
    /// smart mailboxes)
    pub mailbox_path: Vec<String>,
    pub account: String,
}

/// Echo of the active filter predicates
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FiltersApplied {
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub read_status: Option<bool>,
    pub flagged_only: bool,
    pub date_after: Option<String>,
    pub date_before: Option<String>,
}

/// Data for `find_messages`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FindMessagesData {
    pub messages: Vec<MessageSummary>,
    /// Number of messages returned (after the limit)
    pub count: usize,
    /// Number of messages matching the filter, independent of the limit
    pub total_matches: usize,
    pub limit: i64,
    pub has_more: bool,
    pub filters_applied: FiltersApplied,
}

/// Data for `get_message_content`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MessageDetail {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date_received: DateTime<Utc>,
    pub date_sent: Option<DateTime<Utc>>,
    pub read_status: bool,
    pub flagged_status: bool,
    pub junk_status: bool,
    pub message_size: i64,
    /// Full plain-text content
    pub content: String,
    pub to_recipients: Vec<String>,
    pub cc_recipients: Vec<String>,
    pub bcc_recipients: Vec<String>,
    pub mailbox_path: Vec<String>,
    pub account: String,
}

/// One saved draft
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DraftSummary {
    pub draft_id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date_received: DateTime<Utc>,
    pub content_preview: String,
    pub content_length: usize,
    pub to_recipients: Vec<String>,
    pub cc_recipients: Vec<String>,
    pub bcc_recipients: Vec<String>,
    pub total_recipients: usize,
    pub mailbox: String,
    pub account: String,
}

/// Data for `list_drafts`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDraftsData {
    pub drafts: Vec<DraftSummary>,
    pub count: usize,
    pub total_drafts: usize,
    pub limit: i64,
    pub has_more: bool,
}

/// One message of the frontmost viewer's selection
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SelectedMessageInfo {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date_received: DateTime<Utc>,
    pub date_sent: Option<DateTime<Utc>>,
    pub read_status: bool,
    pub flagged_status: bool,
    pub junk_status: bool,
    pub mailbox: String,
    pub account: String,
}

/// Data for `get_selected_messages`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SelectedMessagesData {
    /// Size of the whole selection, independent of the window
    pub selected_count: usize,
    pub messages: Vec<SelectedMessageInfo>,
}

/// Data for `create_outgoing_message`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OutgoingMessageData {
    /// Session-scoped id of the compose object (not a saved-message id)
    pub outgoing_id: OutgoingId,
    pub subject: String,
    pub sender: String,
    /// Recipient lists as read back from the created object
    pub to_recipients: Vec<String>,
    pub cc_recipients: Vec<String>,
    pub bcc_recipients: Vec<String>,
    pub message: String,
    /// Partial-success note when some recipients could not be added
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Data for `replace_outgoing_message`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReplaceOutgoingData {
    /// Id of the newly created compose object
    pub outgoing_id: OutgoingId,
    /// Id the caller passed in, now invalid
    pub old_outgoing_id: OutgoingId,
    pub subject: String,
    pub sender: String,
    pub to_recipients: Vec<String>,
    pub cc_recipients: Vec<String>,
    pub bcc_recipients: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Data for `delete_outgoing_message`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteOutgoingData {
    pub deleted_id: OutgoingId,
    pub subject: String,
    pub message: String,
}

/// Data for `delete_draft`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteDraftData {
    pub draft_id: MessageId,
    pub subject: String,
    /// Account the draft was found in, or `"Local / On My Mac"`
    pub account: String,
    pub message: String,
}

/// Data for `reply_to_message`
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReplyData {
    /// Session-scoped id of the reply compose object
    pub outgoing_id: OutgoingId,
    pub subject: String,
    pub to_recipients: Vec<String>,
    pub cc_recipients: Vec<String>,
    /// Name of the drafts mailbox the reply was saved into
    pub drafts_mailbox: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
