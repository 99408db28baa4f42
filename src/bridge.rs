//! Scripting-bridge traits over the Mail.app object store
//!
//! The engine never talks to Mail.app directly; it goes through this trait
//! family, which mirrors the scripting object model: an application handle,
//! account and mailbox containers, message collections with bulk property
//! fetches, and outgoing compose objects. The production implementation
//! ([`crate::osa`]) evaluates object-specifier expressions through
//! `osascript`; tests substitute an in-memory store.
//!
//! Object handles are lazy references, not snapshots: every method call is
//! a fresh round-trip into the application, and a handle can stop resolving
//! at any time (mailbox deleted, compose window closed, application
//! restarted). Callers treat every call as fallible.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ids::{MessageId, OutgoingId};

/// Raw error from the scripting bridge
///
/// Carries only the free text the target application produced. Translation
/// into the application taxonomy happens in [`crate::errors`], where the
/// heuristic pattern table lives.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BridgeError(pub String);

impl BridgeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Type alias for fallible bridge calls
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Recipient list selector on a message or compose object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientField {
    To,
    Cc,
    Bcc,
}

impl RecipientField {
    /// Label used in diagnostics and warnings ("To", "CC", "BCC")
    pub fn label(&self) -> &'static str {
        match self {
            Self::To => "To",
            Self::Cc => "CC",
            Self::Bcc => "BCC",
        }
    }
}

/// Construction-time properties for a new outgoing message
///
/// Only the fields the object model accepts at `make` time; recipients and
/// content are applied afterwards through [`OutgoingMessage`] methods.
#[derive(Debug, Clone)]
pub struct OutgoingInit {
    pub subject: String,
    /// Sender identity; the application picks its default when absent
    pub sender: Option<String>,
    /// Whether a compose window is shown
    pub visible: bool,
}

/// Top-level application handle
pub trait MailApp: Send + Sync {
    /// Whether the target application is currently launched
    fn running(&self) -> BridgeResult<bool>;

    /// Application version string
    fn version(&self) -> BridgeResult<String>;

    /// All configured accounts in store order
    fn accounts(&self) -> BridgeResult<Vec<Box<dyn Account>>>;

    /// whose-predicate lookup of an account by exact name
    fn account_named(&self, name: &str) -> BridgeResult<Option<Box<dyn Account>>>;

    /// Local (account-less) top-level mailboxes whose name matches any of
    /// `names`, in store order
    ///
    /// This is the disjunctive whose-lookup used to find locale-named
    /// containers such as "Drafts"/"Entwürfe" under the local root.
    fn local_mailboxes_named(&self, names: &[String]) -> BridgeResult<Vec<Box<dyn Mailbox>>>;

    /// All open outgoing (compose) messages in store order
    fn outgoing_messages(&self) -> BridgeResult<Vec<Box<dyn OutgoingMessage>>>;

    /// whose-predicate lookup of an open outgoing message by id
    fn outgoing_with_id(&self, id: OutgoingId) -> BridgeResult<Option<Box<dyn OutgoingMessage>>>;

    /// Create a new outgoing message (`make` with properties)
    fn make_outgoing(&self, init: &OutgoingInit) -> BridgeResult<Box<dyn OutgoingMessage>>;

    /// Delete an open outgoing message by id
    ///
    /// Errors when no open message carries `id`.
    fn delete_outgoing(&self, id: OutgoingId) -> BridgeResult<()>;

    /// Messages selected in the frontmost viewer window
    ///
    /// Empty when no viewer is open or nothing is selected.
    fn selected_messages(&self) -> BridgeResult<Vec<Box<dyn Message>>>;
}

/// Child-mailbox lookup surface shared by accounts and mailboxes
///
/// Both lookup strategies the object model offers are exposed separately:
/// the Path Resolver tries the filtered form first and falls back to the
/// name-indexed form, because either can come back empty on hierarchies
/// with provider-specific structure.
pub trait MailboxContainer {
    /// whose-predicate lookup of a direct child mailbox by exact name
    fn child_by_filter(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>>;

    /// Name-indexed lookup of a direct child mailbox
    ///
    /// Implementations must verify the resulting reference actually
    /// resolves (the object model hands out specifiers for absent names).
    fn child_by_name(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>>;

    /// Direct child mailboxes in store order
    fn children(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>>;
}

/// One configured account
pub trait Account: MailboxContainer {
    fn name(&self) -> BridgeResult<String>;

    fn enabled(&self) -> BridgeResult<bool>;

    /// Addresses configured for this account (may be empty)
    fn email_addresses(&self) -> BridgeResult<Vec<String>>;

    /// Display name of the account owner
    fn full_name(&self) -> BridgeResult<String>;

    /// Every mailbox of the account, any depth, in store order
    ///
    /// The flat enumeration the Path Resolver's reconstruction fallback
    /// walks. Order is the store's, not depth-first over the tree.
    fn all_mailboxes(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>>;

    /// The account's drafts mailbox
    ///
    /// Locale-independent accessor; errors on account types that do not
    /// expose one.
    fn drafts_mailbox(&self) -> BridgeResult<Box<dyn Mailbox>>;
}

/// One mailbox node
pub trait Mailbox: MailboxContainer {
    fn name(&self) -> BridgeResult<String>;

    fn unread_count(&self) -> BridgeResult<i64>;

    /// Parent container back-reference
    ///
    /// The account surfaces at the top of the chain as a container whose
    /// name equals the account name; `None` above that. Parent-chain walks
    /// stop at either signal.
    fn container(&self) -> BridgeResult<Option<Box<dyn Mailbox>>>;

    /// The mailbox's message collection
    fn messages(&self) -> BridgeResult<Box<dyn MessageBatch>>;

    /// whose-predicate lookup of a message by id within this mailbox
    fn message_with_id(&self, id: MessageId) -> BridgeResult<Option<Box<dyn Message>>>;

    /// Delete the message with `id` from this mailbox
    ///
    /// Errors when the mailbox holds no such message.
    fn delete_message(&self, id: MessageId) -> BridgeResult<()>;
}

/// A mailbox's message collection with bulk per-property fetches
///
/// One bulk call materializes one property across every message, which is
/// the only affordable way to scan large mailboxes. Indices are positions
/// in mailbox order and are shared across all property arrays of the same
/// batch.
pub trait MessageBatch {
    /// Number of messages in the collection
    fn len(&self) -> BridgeResult<usize>;

    /// All subjects; `None` entries for messages without one
    fn subjects(&self) -> BridgeResult<Vec<Option<String>>>;

    /// All senders (raw "Name <addr>" strings)
    fn senders(&self) -> BridgeResult<Vec<Option<String>>>;

    fn read_statuses(&self) -> BridgeResult<Vec<bool>>;

    fn flagged_statuses(&self) -> BridgeResult<Vec<bool>>;

    fn dates_received(&self) -> BridgeResult<Vec<Option<DateTime<Utc>>>>;

    /// Handle to the message at `index` in mailbox order
    fn message_at(&self, index: usize) -> BridgeResult<Box<dyn Message>>;
}

/// One saved message
pub trait Message {
    fn id(&self) -> BridgeResult<MessageId>;

    fn subject(&self) -> BridgeResult<String>;

    /// Raw sender string, typically "Name <addr>"
    fn sender(&self) -> BridgeResult<String>;

    fn date_received(&self) -> BridgeResult<DateTime<Utc>>;

    fn date_sent(&self) -> BridgeResult<Option<DateTime<Utc>>>;

    fn read_status(&self) -> BridgeResult<bool>;

    fn flagged_status(&self) -> BridgeResult<bool>;

    fn junk_status(&self) -> BridgeResult<bool>;

    /// Message size in bytes
    fn size(&self) -> BridgeResult<i64>;

    /// Full plain-text content
    fn content(&self) -> BridgeResult<String>;

    /// Addresses of one recipient list
    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>>;

    /// Containing mailbox back-reference
    fn mailbox(&self) -> BridgeResult<Box<dyn Mailbox>>;
}

/// One open outgoing (compose) message
pub trait OutgoingMessage {
    fn id(&self) -> BridgeResult<OutgoingId>;

    fn subject(&self) -> BridgeResult<String>;

    fn sender(&self) -> BridgeResult<String>;

    fn content(&self) -> BridgeResult<String>;

    /// Addresses of one recipient list
    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>>;

    /// Append one recipient object to the given list
    ///
    /// The object model has no list assignment; recipients are discrete
    /// objects appended one at a time, and each append can fail
    /// independently.
    fn append_recipient(&self, field: RecipientField, address: &str) -> BridgeResult<()>;

    /// Insert `text` as a single content block at the content root
    ///
    /// Assigning a plain string to the content property is not supported by
    /// the object model.
    fn set_content(&self, text: &str) -> BridgeResult<()>;

    /// Commit the message as a draft
    fn save(&self) -> BridgeResult<()>;
}
