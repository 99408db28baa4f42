//! Outgoing message lifecycle: create, replace, delete
//!
//! Compose objects live in their own session-scoped id space and disappear
//! when sent, closed, or when Mail.app restarts. The object model offers no
//! partial update for them, so `replace` is an explicit delete-then-recreate
//! with read-back fallbacks and a keep-value sentinel protocol. Recipient
//! appends are reconciled individually: one bad address degrades the result
//! with a warning instead of failing the operation.

use regex::Regex;

use crate::bridge::{MailApp, OutgoingInit, OutgoingMessage, RecipientField};
use crate::envelope::OpLog;
use crate::errors::{AppError, AppResult};
use crate::ids::{MessageId, OutgoingId};
use crate::models::{
    CreateOutgoingMessageInput, DeleteDraftData, DeleteOutgoingData, OmittedFields,
    OutgoingMessageData, ReplaceOutgoingData, ReplaceOutgoingMessageInput,
};

/// Literal value a caller passes to preserve a field across a replace
///
/// For recipient lists the sentinel form is a list of exactly this one
/// element.
pub const KEEP_SENTINEL: &str = "__KEEP__";

/// Fully resolved properties for one compose attempt
pub(crate) struct ComposeSpec {
    pub subject: String,
    pub content: String,
    pub sender: Option<String>,
    pub visible: bool,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// Read-back of a committed compose object plus recipient reconciliation
pub(crate) struct Composed {
    pub id: OutgoingId,
    pub subject: String,
    pub sender: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub requested: usize,
    pub added: usize,
}

/// Create a new outgoing message and save it as a draft
pub fn create_outgoing(
    app: &dyn MailApp,
    input: &CreateOutgoingMessageInput,
    log: &mut OpLog,
) -> AppResult<OutgoingMessageData> {
    let subject = input.subject.trim();
    if subject.is_empty() {
        return Err(AppError::invalid(
            "Subject is required and cannot be empty or whitespace-only",
        ));
    }
    if input.content.is_empty() {
        return Err(AppError::invalid("Content is required"));
    }

    let spec = ComposeSpec {
        subject: subject.to_owned(),
        content: input.content.clone(),
        sender: input.sender.clone().filter(|s| !s.is_empty()),
        visible: input.opening_window,
        to: input.to.clone(),
        cc: input.cc.clone(),
        bcc: input.bcc.clone(),
    };
    let composed = compose(app, &spec, log)?;
    let (message, warning) = completion_status(
        "Outgoing message created successfully",
        "Outgoing message created successfully",
        composed.requested,
        composed.added,
    );

    Ok(OutgoingMessageData {
        outgoing_id: composed.id,
        subject: composed.subject,
        sender: composed.sender,
        to_recipients: composed.to,
        cc_recipients: composed.cc,
        bcc_recipients: composed.bcc,
        message,
        warning,
    })
}

/// Replace an open outgoing message by deleting and recreating it
///
/// Field resolution is three-way: an explicit new value wins, the keep
/// sentinel restores the captured old value, and an omitted field follows
/// the caller-selected policy. The delete and the recreate are two separate
/// steps; an interruption between them loses the old message without a
/// replacement.
pub fn replace_outgoing(
    app: &dyn MailApp,
    input: &ReplaceOutgoingMessageInput,
    log: &mut OpLog,
) -> AppResult<ReplaceOutgoingData> {
    let old = app.outgoing_with_id(input.outgoing_id)?.ok_or_else(|| {
        AppError::not_found(format!(
            "OutgoingMessage with ID {} not found. The message may have been sent, closed, or Mail.app may have been restarted.",
            input.outgoing_id
        ))
    })?;

    // Capture every old property before the delete; these are the fallback
    // values for keep-sentinel and omitted fields.
    let old_subject = old.subject()?;
    let old_sender = old.sender()?;
    let old_content = old.content()?;
    let old_to = read_recipients(old.as_ref(), RecipientField::To, log);
    let old_cc = read_recipients(old.as_ref(), RecipientField::Cc, log);
    let old_bcc = read_recipients(old.as_ref(), RecipientField::Bcc, log);

    let policy = input.omitted_fields;
    let subject = resolve_text(input.subject.as_deref().map(str::trim), &old_subject, policy);
    let content = resolve_text(input.content.as_deref(), &old_content, policy);
    let sender = resolve_text(input.sender.as_deref(), &old_sender, policy);
    let to = resolve_list(input.to.as_deref(), &old_to, policy);
    let cc = resolve_list(input.cc.as_deref(), &old_cc, policy);
    let bcc = resolve_list(input.bcc.as_deref(), &old_bcc, policy);

    app.delete_outgoing(input.outgoing_id)?;
    log.push(format!(
        "Deleted outgoing message {} for replacement",
        input.outgoing_id
    ));

    let spec = ComposeSpec {
        subject,
        content,
        sender: Some(sender).filter(|s| !s.is_empty()),
        visible: input.opening_window,
        to,
        cc,
        bcc,
    };
    let composed = compose(app, &spec, log)?;
    let (message, warning) = completion_status(
        "OutgoingMessage replaced successfully (old message deleted, new message created with updated properties)",
        "OutgoingMessage replaced successfully",
        composed.requested,
        composed.added,
    );

    Ok(ReplaceOutgoingData {
        outgoing_id: composed.id,
        old_outgoing_id: input.outgoing_id,
        subject: composed.subject,
        sender: composed.sender,
        to_recipients: composed.to,
        cc_recipients: composed.cc,
        bcc_recipients: composed.bcc,
        message,
        warning,
    })
}

/// Delete an open outgoing message by id
pub fn delete_outgoing(
    app: &dyn MailApp,
    id: OutgoingId,
    log: &mut OpLog,
) -> AppResult<DeleteOutgoingData> {
    let msg = app
        .outgoing_with_id(id)?
        .ok_or_else(|| AppError::not_found(format!("Outgoing message with ID {id} not found.")))?;
    let subject = msg.subject()?;
    app.delete_outgoing(id)?;
    log.push(format!("Deleted outgoing message with ID {id}."));

    Ok(DeleteOutgoingData {
        deleted_id: id,
        subject,
        message: "Outgoing message deleted successfully.".to_owned(),
    })
}

/// Delete a saved draft by id, searching all accounts then local mailboxes
///
/// Pass one checks every account's drafts mailbox; accounts without one are
/// skipped. Pass two checks top-level local mailboxes carrying a known
/// locale alias of "Drafts". Nothing is deleted unless a match is found.
pub fn delete_draft(
    app: &dyn MailApp,
    drafts_aliases: &[String],
    id: MessageId,
    log: &mut OpLog,
) -> AppResult<DeleteDraftData> {
    let mut found = None;

    for account in app.accounts()? {
        let Ok(drafts) = account.drafts_mailbox() else {
            continue;
        };
        match drafts.message_with_id(id) {
            Ok(Some(msg)) => {
                let account_name = account.name()?;
                log.push(format!("Found draft in account: {account_name}"));
                found = Some((drafts, msg, account_name));
                break;
            }
            Ok(None) => {}
            Err(e) => log.push(format!("Checking an account's drafts failed: {e}")),
        }
    }

    if found.is_none() {
        match app.local_mailboxes_named(drafts_aliases) {
            Ok(local_drafts) => {
                for mailbox in local_drafts {
                    match mailbox.message_with_id(id) {
                        Ok(Some(msg)) => {
                            log.push(format!(
                                "Found draft in local mailbox: {}",
                                mailbox.name()?
                            ));
                            found = Some((mailbox, msg, "Local / On My Mac".to_owned()));
                            break;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            log.push(format!("Checking a local mailbox failed: {e}"))
                        }
                    }
                }
            }
            Err(e) => log.push(format!("Checking local mailboxes failed: {e}")),
        }
    }

    let Some((mailbox, msg, account)) = found else {
        return Err(AppError::not_found(format!(
            "Draft with ID {id} not found in any account."
        )));
    };

    let subject = msg.subject()?;
    mailbox.delete_message(id)?;
    log.push(format!("Deleted draft with ID {id}."));

    Ok(DeleteDraftData {
        draft_id: id,
        subject,
        account,
        message: "Draft deleted successfully.".to_owned(),
    })
}

/// Build, populate, and save one compose object
///
/// Recipient appends are individually guarded; content insertion and the
/// save are not. Read-backs of the committed recipient lists drive the
/// reconciliation counts.
pub(crate) fn compose(
    app: &dyn MailApp,
    spec: &ComposeSpec,
    log: &mut OpLog,
) -> AppResult<Composed> {
    let msg = app.make_outgoing(&OutgoingInit {
        subject: spec.subject.clone(),
        sender: spec.sender.clone(),
        visible: spec.visible,
    })?;

    for (field, addresses) in [
        (RecipientField::To, &spec.to),
        (RecipientField::Cc, &spec.cc),
        (RecipientField::Bcc, &spec.bcc),
    ] {
        for address in addresses.iter().filter(|a| !a.is_empty()) {
            if let Err(e) = msg.append_recipient(field, address) {
                log.push(format!("Error adding {} recipient: {e}", field.label()));
            }
        }
    }

    msg.set_content(&spec.content)?;
    msg.save()?;

    let id = msg.id()?;
    let subject = msg.subject()?;
    let sender = msg.sender()?;
    let to = read_recipients(msg.as_ref(), RecipientField::To, log);
    let cc = read_recipients(msg.as_ref(), RecipientField::Cc, log);
    let bcc = read_recipients(msg.as_ref(), RecipientField::Bcc, log);
    let requested = spec.to.len() + spec.cc.len() + spec.bcc.len();
    let added = to.len() + cc.len() + bcc.len();

    Ok(Composed {
        id,
        subject,
        sender,
        to,
        cc,
        bcc,
        requested,
        added,
    })
}

/// Status text and warning for a compose with possibly-missing recipients
///
/// Distinguishes "none added" from "M of N added"; a fully reconciled
/// compose gets the untouched success message and no warning.
pub(crate) fn completion_status(
    success: &str,
    degraded_base: &str,
    requested: usize,
    added: usize,
) -> (String, Option<String>) {
    if requested == 0 || added >= requested {
        return (success.to_owned(), None);
    }
    if added == 0 {
        (
            format!("{degraded_base}, but recipients could not be added"),
            Some(
                "No recipients could be added. Please add recipients manually in Mail.app before sending."
                    .to_owned(),
            ),
        )
    } else {
        (
            format!("{degraded_base}, but some recipients could not be added"),
            Some(format!(
                "Some recipients could not be added ({added} of {requested} added). Please verify recipients in Mail.app."
            )),
        )
    }
}

/// Extract the bare address from a "Name <addr>" sender string
pub(crate) fn sender_address(sender: &str) -> String {
    Regex::new(r"<([^>]+)>")
        .ok()
        .and_then(|re| {
            re.captures(sender)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_owned())
        })
        .unwrap_or_else(|| sender.to_owned())
}

/// Prefix a subject with "Re: " unless it already carries one
pub(crate) fn reply_subject(subject: &str) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject.to_owned()
    } else {
        format!("Re: {subject}")
    }
}

fn read_recipients(
    msg: &dyn OutgoingMessage,
    field: RecipientField,
    log: &mut OpLog,
) -> Vec<String> {
    match msg.recipients(field) {
        Ok(addresses) => addresses,
        Err(e) => {
            log.push(format!("Error reading {} recipients: {e}", field.label()));
            Vec::new()
        }
    }
}

/// Three-way resolution for a text field: new value, keep sentinel, omitted
fn resolve_text(new: Option<&str>, old: &str, policy: OmittedFields) -> String {
    match new {
        Some(KEEP_SENTINEL) => old.to_owned(),
        Some(value) => {
            // Under the default policy an explicit empty string behaves
            // like an omission, matching truthy-new-else-old semantics.
            if value.is_empty() && policy == OmittedFields::KeepExisting {
                old.to_owned()
            } else {
                value.to_owned()
            }
        }
        None => match policy {
            OmittedFields::KeepExisting => old.to_owned(),
            OmittedFields::RequireSentinel => String::new(),
        },
    }
}

/// Three-way resolution for a recipient list
///
/// The sentinel form is a list of exactly one `"__KEEP__"` element. An
/// explicit empty list clears under both policies.
fn resolve_list(new: Option<&[String]>, old: &[String], policy: OmittedFields) -> Vec<String> {
    match new {
        Some([only]) if only == KEEP_SENTINEL => old.to_vec(),
        Some(list) => list.to_vec(),
        None => match policy {
            OmittedFields::KeepExisting => old.to_vec(),
            OmittedFields::RequireSentinel => Vec::new(),
        },
    }
}
