//! Identifier newtypes for the two Mail.app id spaces
//!
//! Mail.app hands out numeric ids from two unrelated spaces: saved messages
//! (including drafts) carry ids that are stable for the running session
//! within one mailbox/account context, while outgoing compose objects carry
//! ids that die as soon as the object is saved, deleted, or the application
//! restarts. The two spaces are kept as distinct types so an outgoing id can
//! never be passed where a saved-message id is expected, or vice versa.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifier of a saved message or draft
///
/// Stable only within one mailbox/account context and for the current
/// Mail.app session. Not guaranteed to survive an application restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// Identifier of an open outgoing (compose) message
///
/// Valid only until the compose object is saved, deleted, or Mail.app
/// restarts. This is NOT the same id space as [`MessageId`]; there is
/// deliberately no conversion between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct OutgoingId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for OutgoingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
