//! The operation layer: one function per exposed tool
//!
//! Every operation takes the application handle, a validated-by-shape input
//! DTO, and an [`OpLog`] for per-operation diagnostics, and returns either a
//! data payload or an [`AppError`]. Argument validation always precedes any
//! store access, and store access always starts with a running check.
//! Mutating operations delegate to [`crate::outgoing`] once their target is
//! located.

use crate::bridge::{Account, MailApp, Mailbox, Message, RecipientField};
use crate::envelope::OpLog;
use crate::errors::{AppError, AppResult};
use crate::filter::{parse_date_arg, MessageFilter};
use crate::models::{
    AccountInfo, AccountInput, AccountListData, CreateOutgoingMessageInput, DeleteDraftData,
    DeleteDraftInput, DeleteOutgoingData, DeleteOutgoingMessageInput, FiltersApplied,
    FindMessagesData, FindMessagesInput, GetMessageContentInput, GetSelectedMessagesInput,
    ListAccountsInput, ListDraftsData, ListDraftsInput, MailboxInfo, MailboxListData,
    MessageDetail, OutgoingMessageData, ReplaceOutgoingData, ReplaceOutgoingMessageInput,
    ReplyData, ReplyToMessageInput, SelectedMessageInfo, SelectedMessagesData, UnreadMailboxInfo,
    UnreadMailboxesData,
};
use crate::outgoing::{self, compose, completion_status, reply_subject, sender_address, ComposeSpec};
use crate::query::{preview, query_messages, validate_limit};
use crate::resolve::{mailbox_path, resolve_mailbox};

/// Upper bound for `get_selected_messages`, which reads the live viewer
/// selection and stays deliberately small
const MAX_SELECTED_LIMIT: i64 = 100;

fn ensure_running(app: &dyn MailApp) -> AppResult<()> {
    if app.running()? {
        Ok(())
    } else {
        Err(AppError::NotRunning)
    }
}

fn require_account(app: &dyn MailApp, name: &str) -> AppResult<Box<dyn Account>> {
    app.account_named(name)?.ok_or_else(|| {
        AppError::not_found(format!(
            "Account \"{name}\" not found. Please verify the account name is correct."
        ))
    })
}

/// List configured accounts, optionally restricted to enabled ones
pub fn list_accounts(
    app: &dyn MailApp,
    input: &ListAccountsInput,
    _log: &mut OpLog,
) -> AppResult<AccountListData> {
    ensure_running(app)?;

    let mut accounts = Vec::new();
    for account in app.accounts()? {
        let enabled = account.enabled()?;
        if input.filter_enabled && !enabled {
            continue;
        }
        // Addresses and mailboxes are not available for every account type.
        let email_addresses = account.email_addresses().unwrap_or_default();
        let mailbox_count = account.all_mailboxes().map(|m| m.len()).unwrap_or(0);
        accounts.push(AccountInfo {
            name: account.name()?,
            enabled,
            email_addresses,
            mailbox_count,
        });
    }

    let count = accounts.len();
    Ok(AccountListData { accounts, count })
}

/// List every mailbox of one account with its unread count
pub fn list_mailboxes(
    app: &dyn MailApp,
    input: &AccountInput,
    _log: &mut OpLog,
) -> AppResult<MailboxListData> {
    ensure_running(app)?;
    let account = require_account(app, &input.account)?;

    let mut mailboxes = Vec::new();
    for mailbox in account.all_mailboxes()? {
        mailboxes.push(MailboxInfo {
            name: mailbox.name()?,
            account: input.account.clone(),
            unread_count: mailbox.unread_count()?,
        });
    }

    let count = mailboxes.len();
    Ok(MailboxListData { mailboxes, count })
}

/// Walk one account's mailbox tree and report every node with unread mail
pub fn find_unread_mailboxes(
    app: &dyn MailApp,
    input: &AccountInput,
    log: &mut OpLog,
) -> AppResult<UnreadMailboxesData> {
    ensure_running(app)?;
    let account = require_account(app, &input.account)?;

    let mut mailboxes = Vec::new();
    let top_level = account.children()?;
    log.push(format!(
        "Found {} top-level mailboxes in account \"{}\". Starting scan.",
        top_level.len(),
        input.account
    ));
    for mailbox in &top_level {
        scan_unread(mailbox.as_ref(), &input.account, &mut mailboxes, log)?;
    }
    log.push(format!(
        "Scan complete. Found {} mailboxes with unread messages.",
        mailboxes.len()
    ));

    let count = mailboxes.len();
    Ok(UnreadMailboxesData { mailboxes, count })
}

fn scan_unread(
    mailbox: &dyn Mailbox,
    account_name: &str,
    out: &mut Vec<UnreadMailboxInfo>,
    log: &mut OpLog,
) -> AppResult<()> {
    match mailbox.unread_count() {
        Ok(unread) if unread > 0 => {
            let path = mailbox_path(mailbox, account_name);
            log.push(format!("Found {unread} unread in: \"{}\"", path.join(" > ")));
            out.push(UnreadMailboxInfo {
                name: mailbox.name()?,
                path,
                unread_count: unread,
            });
        }
        Ok(_) => {}
        Err(e) => log.push(format!("Could not get unread count: {e}")),
    }
    for child in mailbox.children()? {
        scan_unread(child.as_ref(), account_name, out, log)?;
    }
    Ok(())
}

/// Search one mailbox with a compound filter and first-page pagination
pub fn find_messages(
    app: &dyn MailApp,
    input: &FindMessagesInput,
    log: &mut OpLog,
) -> AppResult<FindMessagesData> {
    ensure_running(app)?;
    if input.mailbox_path.is_empty() {
        return Err(AppError::invalid("Mailbox path must be a non-empty array"));
    }
    let limit = validate_limit(input.limit)?;

    let filter = MessageFilter {
        subject: input.subject.clone().filter(|s| !s.is_empty()),
        sender: input.sender.clone().filter(|s| !s.is_empty()),
        read_status: input.read_status,
        flagged_only: input.flagged_only,
        date_after: input
            .date_after
            .as_deref()
            .map(|v| parse_date_arg(v, "date_after"))
            .transpose()?,
        date_before: input
            .date_before
            .as_deref()
            .map(|v| parse_date_arg(v, "date_before"))
            .transpose()?,
    };

    let account = require_account(app, &input.account)?;
    let mailbox = resolve_mailbox(account.as_ref(), &input.mailbox_path, log)?
        .into_mailbox()
        .ok_or_else(|| AppError::invalid("Mailbox path must be a non-empty array"))?;

    let outcome = query_messages(
        mailbox.as_ref(),
        &input.account,
        &input.mailbox_path,
        &filter,
        limit,
        log,
    )?;

    Ok(FindMessagesData {
        count: outcome.messages.len(),
        messages: outcome.messages,
        total_matches: outcome.total_matches,
        limit: input.limit,
        has_more: outcome.total_matches > limit,
        filters_applied: FiltersApplied {
            subject: input.subject.clone(),
            sender: input.sender.clone(),
            read_status: input.read_status,
            flagged_only: input.flagged_only,
            date_after: input.date_after.clone(),
            date_before: input.date_before.clone(),
        },
    })
}

/// Fetch one message's full content and recipient lists
pub fn get_message_content(
    app: &dyn MailApp,
    input: &GetMessageContentInput,
    log: &mut OpLog,
) -> AppResult<MessageDetail> {
    ensure_running(app)?;
    if input.mailbox_path.is_empty() {
        return Err(AppError::invalid("Mailbox path must be a non-empty array"));
    }

    let account = require_account(app, &input.account)?;
    let mailbox = resolve_mailbox(account.as_ref(), &input.mailbox_path, log)?
        .into_mailbox()
        .ok_or_else(|| AppError::invalid("Mailbox path must be a non-empty array"))?;

    let msg = mailbox.message_with_id(input.message_id)?.ok_or_else(|| {
        AppError::not_found(format!(
            "Message with ID {} not found in mailbox \"{}\". The message may have been deleted or moved.",
            input.message_id,
            input.mailbox_path.join(" > ")
        ))
    })?;

    let detail_path = match msg.mailbox() {
        Ok(containing) => mailbox_path(containing.as_ref(), &input.account),
        Err(e) => {
            log.push(format!("Error reading mailbox path: {e}"));
            input.mailbox_path.clone()
        }
    };

    Ok(MessageDetail {
        id: msg.id()?,
        subject: msg.subject()?,
        sender: msg.sender()?,
        date_received: msg.date_received()?,
        date_sent: msg.date_sent()?,
        read_status: msg.read_status()?,
        flagged_status: msg.flagged_status()?,
        junk_status: msg.junk_status()?,
        message_size: msg.size()?,
        content: msg.content()?,
        to_recipients: message_recipients(msg.as_ref(), RecipientField::To, log),
        cc_recipients: message_recipients(msg.as_ref(), RecipientField::Cc, log),
        bcc_recipients: message_recipients(msg.as_ref(), RecipientField::Bcc, log),
        mailbox_path: detail_path,
        account: input.account.clone(),
    })
}

/// List one account's drafts, newest-first in store order
pub fn list_drafts(
    app: &dyn MailApp,
    input: &ListDraftsInput,
    log: &mut OpLog,
) -> AppResult<ListDraftsData> {
    ensure_running(app)?;
    let limit = validate_limit(input.limit)?;
    let account = require_account(app, &input.account)?;

    let drafts_mailbox = account.drafts_mailbox()?;
    let batch = drafts_mailbox.messages()?;
    let total_drafts = batch.len()?;

    let mut drafts = Vec::new();
    for index in 0..total_drafts.min(limit) {
        let draft = match batch.message_at(index).and_then(|msg| {
            let id = msg.id()?;
            let subject = msg.subject()?;
            let sender = msg.sender()?;
            let date_received = msg.date_received()?;

            let content = match msg.content() {
                Ok(content) => content,
                Err(_) => String::new(),
            };
            let to = message_recipients(msg.as_ref(), RecipientField::To, log);
            let cc = message_recipients(msg.as_ref(), RecipientField::Cc, log);
            let bcc = message_recipients(msg.as_ref(), RecipientField::Bcc, log);
            let mailbox = match msg.mailbox().and_then(|m| m.name()) {
                Ok(name) => name,
                Err(e) => {
                    log.push(format!("Error reading mailbox name: {e}"));
                    "Drafts".to_owned()
                }
            };

            Ok(crate::models::DraftSummary {
                draft_id: id,
                subject,
                sender,
                date_received,
                content_preview: preview(&content),
                content_length: content.chars().count(),
                total_recipients: to.len() + cc.len() + bcc.len(),
                to_recipients: to,
                cc_recipients: cc,
                bcc_recipients: bcc,
                mailbox,
                account: input.account.clone(),
            })
        }) {
            Ok(draft) => draft,
            Err(e) => {
                log.push(format!("Error reading draft {index}: {e}"));
                continue;
            }
        };
        drafts.push(draft);
    }

    Ok(ListDraftsData {
        count: drafts.len(),
        drafts,
        total_drafts,
        limit: input.limit,
        has_more: total_drafts > limit,
    })
}

/// Report the messages selected in the frontmost viewer window
pub fn get_selected_messages(
    app: &dyn MailApp,
    input: &GetSelectedMessagesInput,
    log: &mut OpLog,
) -> AppResult<SelectedMessagesData> {
    ensure_running(app)?;
    if input.limit < 1 {
        return Err(AppError::invalid("Limit is required and must be at least 1"));
    }
    if input.limit > MAX_SELECTED_LIMIT {
        return Err(AppError::invalid(format!("Limit cannot exceed {MAX_SELECTED_LIMIT}")));
    }
    if input.start_at < 0 {
        return Err(AppError::invalid("start_at must be 0 or greater"));
    }

    let selected = app.selected_messages()?;
    let selected_count = selected.len();
    let start = input.start_at as usize;
    let limit = input.limit as usize;

    let mut messages = Vec::new();
    if start < selected_count {
        let end = (start + limit).min(selected_count);
        for (index, msg) in selected[start..end].iter().enumerate() {
            match selected_message_info(msg.as_ref()) {
                Ok(info) => messages.push(info),
                Err(e) => log.push(format!("Error reading selected message {}: {e}", start + index)),
            }
        }
    }

    Ok(SelectedMessagesData {
        selected_count,
        messages,
    })
}

fn selected_message_info(msg: &dyn Message) -> crate::bridge::BridgeResult<SelectedMessageInfo> {
    let mailbox = msg.mailbox()?;
    Ok(SelectedMessageInfo {
        id: msg.id()?,
        subject: msg.subject()?,
        sender: msg.sender()?,
        date_received: msg.date_received()?,
        date_sent: msg.date_sent()?,
        read_status: msg.read_status()?,
        flagged_status: msg.flagged_status()?,
        junk_status: msg.junk_status()?,
        mailbox: mailbox.name()?,
        account: owning_account_name(mailbox)?,
    })
}

/// Name of the account at the top of a mailbox's parent chain
fn owning_account_name(mailbox: Box<dyn Mailbox>) -> crate::bridge::BridgeResult<String> {
    let mut current = mailbox;
    loop {
        match current.container()? {
            Some(parent) => current = parent,
            None => return current.name(),
        }
    }
}

/// Create a new outgoing message, saved as a draft
pub fn create_outgoing_message(
    app: &dyn MailApp,
    input: &CreateOutgoingMessageInput,
    log: &mut OpLog,
) -> AppResult<OutgoingMessageData> {
    ensure_running(app)?;
    outgoing::create_outgoing(app, input, log)
}

/// Replace an open outgoing message via delete and recreate
pub fn replace_outgoing_message(
    app: &dyn MailApp,
    input: &ReplaceOutgoingMessageInput,
    log: &mut OpLog,
) -> AppResult<ReplaceOutgoingData> {
    ensure_running(app)?;
    outgoing::replace_outgoing(app, input, log)
}

/// Delete an open outgoing message by id
pub fn delete_outgoing_message(
    app: &dyn MailApp,
    input: &DeleteOutgoingMessageInput,
    log: &mut OpLog,
) -> AppResult<DeleteOutgoingData> {
    ensure_running(app)?;
    outgoing::delete_outgoing(app, input.outgoing_id, log)
}

/// Delete a saved draft, searching accounts then locale-named local mailboxes
pub fn delete_draft(
    app: &dyn MailApp,
    drafts_aliases: &[String],
    input: &DeleteDraftInput,
    log: &mut OpLog,
) -> AppResult<DeleteDraftData> {
    ensure_running(app)?;
    outgoing::delete_draft(app, drafts_aliases, input.draft_id, log)
}

/// Compose a reply to a saved message and commit it to drafts
///
/// The reply goes to the original sender's bare address; with
/// `reply_to_all` the original CC list is carried over. The result reports
/// the new compose object's id and the drafts mailbox it landed in.
pub fn reply_to_message(
    app: &dyn MailApp,
    input: &ReplyToMessageInput,
    log: &mut OpLog,
) -> AppResult<ReplyData> {
    ensure_running(app)?;
    if input.reply_content.is_empty() {
        return Err(AppError::invalid("Reply content is required"));
    }
    if input.mailbox_path.is_empty() {
        return Err(AppError::invalid("Mailbox path must be a non-empty array"));
    }

    let account = require_account(app, &input.account)?;
    let mailbox = resolve_mailbox(account.as_ref(), &input.mailbox_path, log)?
        .into_mailbox()
        .ok_or_else(|| AppError::invalid("Mailbox path must be a non-empty array"))?;
    let original = mailbox.message_with_id(input.message_id)?.ok_or_else(|| {
        AppError::not_found(format!(
            "Message with ID {} not found in mailbox \"{}\". The message may have been deleted or moved.",
            input.message_id,
            input.mailbox_path.join(" > ")
        ))
    })?;

    let sender = match account.email_addresses()?.first() {
        Some(address) => {
            let full_name = account.full_name()?;
            Some(if full_name.is_empty() {
                address.clone()
            } else {
                format!("{full_name} <{address}>")
            })
        }
        None => None,
    };

    let to = vec![sender_address(&original.sender()?)];
    let cc = if input.reply_to_all {
        message_recipients(original.as_ref(), RecipientField::Cc, log)
    } else {
        Vec::new()
    };

    let spec = ComposeSpec {
        subject: reply_subject(&original.subject()?),
        content: input.reply_content.clone(),
        sender,
        visible: input.opening_window,
        to,
        cc,
        bcc: Vec::new(),
    };
    let composed = compose(app, &spec, log)?;
    let (message, warning) = completion_status(
        "Reply saved to drafts successfully",
        "Reply saved to drafts successfully",
        composed.requested,
        composed.added,
    );

    let drafts_mailbox = match account.drafts_mailbox().and_then(|m| m.name()) {
        Ok(name) => name,
        Err(e) => {
            log.push(format!("Error reading drafts mailbox name: {e}"));
            "Drafts".to_owned()
        }
    };

    Ok(ReplyData {
        outgoing_id: composed.id,
        subject: composed.subject,
        to_recipients: composed.to,
        cc_recipients: composed.cc,
        drafts_mailbox,
        message,
        warning,
    })
}

fn message_recipients(msg: &dyn Message, field: RecipientField, log: &mut OpLog) -> Vec<String> {
    match msg.recipients(field) {
        Ok(addresses) => addresses,
        Err(e) => {
            log.push(format!("Error reading {} recipients: {e}", field.label()));
            Vec::new()
        }
    }
}
