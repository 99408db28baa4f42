//! Path Resolver: account-relative mailbox paths to mailbox handles
//!
//! A mailbox path is the ordered list of mailbox names from (but excluding)
//! the account down to the target. Resolution tries cheap direct descent
//! first: for each segment, a filtered (whose-style) child lookup, then the
//! name-indexed form. Provider-specific hierarchies sometimes defeat both
//! even though the mailbox exists, so a miss falls back to reconstruction:
//! enumerate every mailbox of the account, rebuild each one's path by
//! walking parent references, and take the first exact match. Direct
//! descent is O(depth); reconstruction is O(mailboxes x depth) and only
//! runs when descent fails.

use crate::bridge::{Account, Mailbox, MailboxContainer};
use crate::envelope::OpLog;
use crate::errors::{AppError, AppResult};

/// Outcome of resolving a mailbox path
pub enum ResolvedTarget {
    /// The empty path: the account's root container itself
    AccountRoot,
    /// A concrete mailbox
    Mailbox(Box<dyn Mailbox>),
}

impl ResolvedTarget {
    /// The mailbox, or `None` for the account root
    pub fn into_mailbox(self) -> Option<Box<dyn Mailbox>> {
        match self {
            Self::AccountRoot => None,
            Self::Mailbox(mailbox) => Some(mailbox),
        }
    }
}

/// Resolve `path` within `account`
///
/// An empty path resolves to the account root (never `NotFound`). All name
/// matching is exact. A terminal miss is reported as `NotFound` naming the
/// account and the joined path; lower-level lookup failures along the way
/// are recorded in `log`, not surfaced.
pub fn resolve_mailbox(
    account: &dyn Account,
    path: &[String],
    log: &mut OpLog,
) -> AppResult<ResolvedTarget> {
    if path.is_empty() {
        return Ok(ResolvedTarget::AccountRoot);
    }

    if let Some(mailbox) = descend(account, path, log) {
        return Ok(ResolvedTarget::Mailbox(mailbox));
    }

    let account_name = account.name()?;
    log.push(format!(
        "Direct traversal failed for path '{}'; scanning all mailboxes of account '{}'",
        path.join(" > "),
        account_name
    ));

    if let Some(mailbox) = reconstruct(account, &account_name, path)? {
        return Ok(ResolvedTarget::Mailbox(mailbox));
    }

    Err(AppError::not_found(format!(
        "Mailbox path '{}' not found in account '{}'.",
        path.join(" > "),
        account_name
    )))
}

/// Direct descent: segment-by-segment child lookup from the account root
///
/// Fails fast (returns `None`) as soon as one segment has no match under
/// either lookup strategy.
fn descend(account: &dyn Account, path: &[String], log: &mut OpLog) -> Option<Box<dyn Mailbox>> {
    let mut current: Option<Box<dyn Mailbox>> = None;
    for segment in path {
        let container: &dyn MailboxContainer = match current.as_deref() {
            Some(mailbox) => mailbox,
            None => account,
        };
        current = Some(lookup_child(container, segment, log)?);
    }
    current
}

/// One segment's child lookup: filtered form first, name-indexed second
fn lookup_child(
    container: &dyn MailboxContainer,
    name: &str,
    log: &mut OpLog,
) -> Option<Box<dyn Mailbox>> {
    match container.child_by_filter(name) {
        Ok(Some(mailbox)) => return Some(mailbox),
        Ok(None) => {}
        Err(e) => log.push(format!("Filtered lookup failed for mailbox '{name}': {e}")),
    }
    match container.child_by_name(name) {
        Ok(found) => found,
        Err(e) => {
            log.push(format!("Indexed lookup failed for mailbox '{name}': {e}"));
            None
        }
    }
}

/// Reconstruction fallback: match against every mailbox's rebuilt path
fn reconstruct(
    account: &dyn Account,
    account_name: &str,
    path: &[String],
) -> AppResult<Option<Box<dyn Mailbox>>> {
    for mailbox in account.all_mailboxes()? {
        let candidate = mailbox_path(mailbox.as_ref(), account_name);
        if candidate.len() == path.len() && candidate.iter().zip(path).all(|(a, b)| a == b) {
            return Ok(Some(mailbox));
        }
    }
    Ok(None)
}

/// Rebuild a mailbox's path by walking parent references
///
/// Root-to-leaf order, excluding the account itself. The walk stops when a
/// container's name equals the account name or the chain ends; a failing
/// property read truncates the walk rather than erroring, mirroring how
/// little the store guarantees about parent chains.
pub fn mailbox_path(mailbox: &dyn Mailbox, account_name: &str) -> Vec<String> {
    let mut path = Vec::new();
    let Ok(name) = mailbox.name() else {
        return path;
    };
    if name == account_name {
        return path;
    }
    path.push(name);

    let mut cursor = mailbox.container().ok().flatten();
    while let Some(parent) = cursor {
        let Ok(name) = parent.name() else {
            break;
        };
        if name == account_name {
            break;
        }
        path.insert(0, name);
        cursor = parent.container().ok().flatten();
    }
    path
}
