//! In-memory fake mail store for tests
//!
//! Implements the bridge trait family over a shared arena so engine and
//! operation tests run without a live Mail.app. Failure knobs reproduce the
//! store's unreliability: child lookups can be disabled (forcing the Path
//! Resolver's reconstruction fallback), individual messages can be poisoned
//! so their property reads fail, and recipient addresses can be marked as
//! rejected by the application.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};

use crate::bridge::{
    Account, BridgeError, BridgeResult, MailApp, Mailbox, MailboxContainer, Message, MessageBatch,
    OutgoingInit, OutgoingMessage, RecipientField,
};
use crate::ids::{MessageId, OutgoingId};

#[derive(Debug, Clone, Copy)]
pub struct AccountHandle(usize);

#[derive(Debug, Clone, Copy)]
pub struct MailboxHandle(usize);

struct AccountRec {
    name: String,
    enabled: bool,
    email_addresses: Vec<String>,
    full_name: String,
}

struct MailboxRec {
    name: String,
    /// Owning account index; `None` for local (account-less) mailboxes
    account: Option<usize>,
    /// Parent mailbox index; `None` for top-level mailboxes
    parent: Option<usize>,
    unread: i64,
    /// Id lookups against this mailbox fail
    id_lookup_broken: bool,
}

struct MessageRec {
    id: i64,
    mailbox: usize,
    subject: String,
    sender: String,
    date_received: DateTime<Utc>,
    date_sent: Option<DateTime<Utc>>,
    read: bool,
    flagged: bool,
    junk: bool,
    size: i64,
    content: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    deleted: bool,
    /// All per-message property reads fail
    poisoned: bool,
    /// Only the content read fails
    content_poisoned: bool,
}

struct OutgoingRec {
    id: i64,
    subject: String,
    sender: String,
    content: String,
    visible: bool,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    saved: bool,
    deleted: bool,
}

struct Store {
    running: bool,
    filter_lookup: bool,
    name_lookup: bool,
    accounts: Vec<AccountRec>,
    mailboxes: Vec<MailboxRec>,
    messages: Vec<MessageRec>,
    outgoing: Vec<OutgoingRec>,
    selected: Vec<i64>,
    rejected_addresses: HashSet<String>,
    next_message_id: i64,
    next_outgoing_id: i64,
}

/// Fake Mail.app backed by an in-memory arena
///
/// Cloning shares the underlying store.
#[derive(Clone)]
pub struct FakeMail {
    store: Arc<Mutex<Store>>,
}

/// Per-message fixture properties with sensible defaults
pub struct MessageSpec {
    pub subject: String,
    pub sender: String,
    pub date_received: DateTime<Utc>,
    pub date_sent: Option<DateTime<Utc>>,
    pub read: bool,
    pub flagged: bool,
    pub junk: bool,
    pub size: i64,
    pub content: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl MessageSpec {
    pub fn new(subject: &str, sender: &str) -> Self {
        Self {
            subject: subject.to_owned(),
            sender: sender.to_owned(),
            date_received: Utc
                .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            date_sent: None,
            read: false,
            flagged: false,
            junk: false,
            size: 1024,
            content: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
        }
    }

    pub fn received(mut self, at: DateTime<Utc>) -> Self {
        self.date_received = at;
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn flagged(mut self, flagged: bool) -> Self {
        self.flagged = flagged;
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_owned();
        self
    }

    pub fn to(mut self, addresses: &[&str]) -> Self {
        self.to = addresses.iter().map(|a| (*a).to_owned()).collect();
        self
    }

    pub fn cc(mut self, addresses: &[&str]) -> Self {
        self.cc = addresses.iter().map(|a| (*a).to_owned()).collect();
        self
    }
}

impl FakeMail {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                running: true,
                filter_lookup: true,
                name_lookup: true,
                accounts: Vec::new(),
                mailboxes: Vec::new(),
                messages: Vec::new(),
                outgoing: Vec::new(),
                selected: Vec::new(),
                rejected_addresses: HashSet::new(),
                next_message_id: 1001,
                next_outgoing_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("fake store lock poisoned")
    }

    pub fn add_account(&self, name: &str) -> AccountHandle {
        let mut store = self.lock();
        store.accounts.push(AccountRec {
            name: name.to_owned(),
            enabled: true,
            email_addresses: Vec::new(),
            full_name: String::new(),
        });
        AccountHandle(store.accounts.len() - 1)
    }

    pub fn set_account_enabled(&self, account: AccountHandle, enabled: bool) {
        self.lock().accounts[account.0].enabled = enabled;
    }

    pub fn set_account_identity(&self, account: AccountHandle, full_name: &str, addresses: &[&str]) {
        let mut store = self.lock();
        store.accounts[account.0].full_name = full_name.to_owned();
        store.accounts[account.0].email_addresses =
            addresses.iter().map(|a| (*a).to_owned()).collect();
    }

    /// Create (or reuse) the mailbox chain `path` under `account`
    pub fn add_mailbox(&self, account: AccountHandle, path: &[&str]) -> MailboxHandle {
        let mut store = self.lock();
        let mut parent: Option<usize> = None;
        let mut index = 0;
        for segment in path {
            let existing = store
                .mailboxes
                .iter()
                .position(|m| m.account == Some(account.0) && m.parent == parent && m.name == *segment);
            index = match existing {
                Some(i) => i,
                None => {
                    store.mailboxes.push(MailboxRec {
                        name: (*segment).to_owned(),
                        account: Some(account.0),
                        parent,
                        unread: 0,
                        id_lookup_broken: false,
                    });
                    store.mailboxes.len() - 1
                }
            };
            parent = Some(index);
        }
        MailboxHandle(index)
    }

    /// Create a top-level local mailbox (no owning account)
    pub fn add_local_mailbox(&self, name: &str) -> MailboxHandle {
        let mut store = self.lock();
        store.mailboxes.push(MailboxRec {
            name: name.to_owned(),
            account: None,
            parent: None,
            unread: 0,
            id_lookup_broken: false,
        });
        MailboxHandle(store.mailboxes.len() - 1)
    }

    pub fn set_unread(&self, mailbox: MailboxHandle, unread: i64) {
        self.lock().mailboxes[mailbox.0].unread = unread;
    }

    pub fn add_message(&self, mailbox: MailboxHandle, spec: MessageSpec) -> MessageId {
        let mut store = self.lock();
        let id = store.next_message_id;
        store.next_message_id += 1;
        store.messages.push(MessageRec {
            id,
            mailbox: mailbox.0,
            subject: spec.subject,
            sender: spec.sender,
            date_received: spec.date_received,
            date_sent: spec.date_sent,
            read: spec.read,
            flagged: spec.flagged,
            junk: spec.junk,
            size: spec.size,
            content: spec.content,
            to: spec.to,
            cc: spec.cc,
            bcc: spec.bcc,
            deleted: false,
            poisoned: false,
            content_poisoned: false,
        });
        MessageId(id)
    }

    /// Make every per-message property read of `id` fail
    pub fn poison_message(&self, id: MessageId) {
        if let Some(rec) = self.lock().messages.iter_mut().find(|m| m.id == id.0) {
            rec.poisoned = true;
        }
    }

    /// Make only the content read of `id` fail
    pub fn poison_content(&self, id: MessageId) {
        if let Some(rec) = self.lock().messages.iter_mut().find(|m| m.id == id.0) {
            rec.content_poisoned = true;
        }
    }

    /// Make id lookups against `mailbox` fail
    pub fn break_id_lookup(&self, mailbox: MailboxHandle) {
        self.lock().mailboxes[mailbox.0].id_lookup_broken = true;
    }

    /// Mark an address as rejected by recipient-object construction
    pub fn reject_address(&self, address: &str) {
        self.lock().rejected_addresses.insert(address.to_owned());
    }

    /// Populate the frontmost-viewer selection
    pub fn select_messages(&self, ids: &[MessageId]) {
        self.lock().selected = ids.iter().map(|id| id.0).collect();
    }

    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    pub fn disable_filter_lookup(&self) {
        self.lock().filter_lookup = false;
    }

    pub fn disable_child_lookups(&self) {
        let mut store = self.lock();
        store.filter_lookup = false;
        store.name_lookup = false;
    }

    pub fn enable_child_lookups(&self) {
        let mut store = self.lock();
        store.filter_lookup = true;
        store.name_lookup = true;
    }

    /// Number of open (not deleted) outgoing messages
    pub fn open_outgoing_count(&self) -> usize {
        self.lock().outgoing.iter().filter(|o| !o.deleted).count()
    }

    fn child_lookup(&self, account: Option<usize>, parent: Option<usize>, name: &str, filtered: bool) -> Option<usize> {
        let store = self.lock();
        let enabled = if filtered {
            store.filter_lookup
        } else {
            store.name_lookup
        };
        if !enabled {
            return None;
        }
        store
            .mailboxes
            .iter()
            .position(|m| m.account == account && m.parent == parent && m.name == name)
    }

    fn mailbox_handle(&self, index: usize) -> Box<dyn Mailbox> {
        Box::new(FakeMailbox {
            mail: self.clone(),
            node: Node::Mailbox(index),
        })
    }
}

impl Default for FakeMail {
    fn default() -> Self {
        Self::new()
    }
}

impl MailApp for FakeMail {
    fn running(&self) -> BridgeResult<bool> {
        Ok(self.lock().running)
    }

    fn version(&self) -> BridgeResult<String> {
        Ok("16.0".to_owned())
    }

    fn accounts(&self) -> BridgeResult<Vec<Box<dyn Account>>> {
        let count = self.lock().accounts.len();
        Ok((0..count)
            .map(|i| Box::new(FakeAccount { mail: self.clone(), index: i }) as Box<dyn Account>)
            .collect())
    }

    fn account_named(&self, name: &str) -> BridgeResult<Option<Box<dyn Account>>> {
        let index = self.lock().accounts.iter().position(|a| a.name == name);
        Ok(index.map(|i| Box::new(FakeAccount { mail: self.clone(), index: i }) as Box<dyn Account>))
    }

    fn local_mailboxes_named(&self, names: &[String]) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        let indices: Vec<usize> = {
            let store = self.lock();
            store
                .mailboxes
                .iter()
                .enumerate()
                .filter(|(_, m)| m.account.is_none() && m.parent.is_none() && names.contains(&m.name))
                .map(|(i, _)| i)
                .collect()
        };
        Ok(indices.into_iter().map(|i| self.mailbox_handle(i)).collect())
    }

    fn outgoing_messages(&self) -> BridgeResult<Vec<Box<dyn OutgoingMessage>>> {
        let ids: Vec<i64> = {
            let store = self.lock();
            store.outgoing.iter().filter(|o| !o.deleted).map(|o| o.id).collect()
        };
        Ok(ids
            .into_iter()
            .map(|id| Box::new(FakeOutgoing { mail: self.clone(), id }) as Box<dyn OutgoingMessage>)
            .collect())
    }

    fn outgoing_with_id(&self, id: OutgoingId) -> BridgeResult<Option<Box<dyn OutgoingMessage>>> {
        let found = self
            .lock()
            .outgoing
            .iter()
            .any(|o| o.id == id.0 && !o.deleted);
        Ok(found.then(|| {
            Box::new(FakeOutgoing { mail: self.clone(), id: id.0 }) as Box<dyn OutgoingMessage>
        }))
    }

    fn make_outgoing(&self, init: &OutgoingInit) -> BridgeResult<Box<dyn OutgoingMessage>> {
        let mut store = self.lock();
        let id = store.next_outgoing_id;
        store.next_outgoing_id += 1;
        store.outgoing.push(OutgoingRec {
            id,
            subject: init.subject.clone(),
            sender: init.sender.clone().unwrap_or_default(),
            content: String::new(),
            visible: init.visible,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            saved: false,
            deleted: false,
        });
        drop(store);
        Ok(Box::new(FakeOutgoing { mail: self.clone(), id }))
    }

    fn delete_outgoing(&self, id: OutgoingId) -> BridgeResult<()> {
        let mut store = self.lock();
        match store.outgoing.iter_mut().find(|o| o.id == id.0 && !o.deleted) {
            Some(rec) => {
                rec.deleted = true;
                Ok(())
            }
            None => Err(BridgeError::new(format!(
                "outgoing message {id} no longer exists"
            ))),
        }
    }

    fn selected_messages(&self) -> BridgeResult<Vec<Box<dyn Message>>> {
        let ids = self.lock().selected.clone();
        Ok(ids
            .into_iter()
            .map(|id| Box::new(FakeMessage { mail: self.clone(), id }) as Box<dyn Message>)
            .collect())
    }
}

struct FakeAccount {
    mail: FakeMail,
    index: usize,
}

impl MailboxContainer for FakeAccount {
    fn child_by_filter(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        Ok(self
            .mail
            .child_lookup(Some(self.index), None, name, true)
            .map(|i| self.mail.mailbox_handle(i)))
    }

    fn child_by_name(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        Ok(self
            .mail
            .child_lookup(Some(self.index), None, name, false)
            .map(|i| self.mail.mailbox_handle(i)))
    }

    fn children(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        let indices: Vec<usize> = {
            let store = self.mail.lock();
            store
                .mailboxes
                .iter()
                .enumerate()
                .filter(|(_, m)| m.account == Some(self.index) && m.parent.is_none())
                .map(|(i, _)| i)
                .collect()
        };
        Ok(indices.into_iter().map(|i| self.mail.mailbox_handle(i)).collect())
    }
}

impl Account for FakeAccount {
    fn name(&self) -> BridgeResult<String> {
        Ok(self.mail.lock().accounts[self.index].name.clone())
    }

    fn enabled(&self) -> BridgeResult<bool> {
        Ok(self.mail.lock().accounts[self.index].enabled)
    }

    fn email_addresses(&self) -> BridgeResult<Vec<String>> {
        Ok(self.mail.lock().accounts[self.index].email_addresses.clone())
    }

    fn full_name(&self) -> BridgeResult<String> {
        Ok(self.mail.lock().accounts[self.index].full_name.clone())
    }

    fn all_mailboxes(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        let indices: Vec<usize> = {
            let store = self.mail.lock();
            store
                .mailboxes
                .iter()
                .enumerate()
                .filter(|(_, m)| m.account == Some(self.index))
                .map(|(i, _)| i)
                .collect()
        };
        Ok(indices.into_iter().map(|i| self.mail.mailbox_handle(i)).collect())
    }

    fn drafts_mailbox(&self) -> BridgeResult<Box<dyn Mailbox>> {
        let index = {
            let store = self.mail.lock();
            store.mailboxes.iter().position(|m| {
                m.account == Some(self.index) && m.parent.is_none() && m.name == "Drafts"
            })
        };
        match index {
            Some(i) => Ok(self.mail.mailbox_handle(i)),
            None => Err(BridgeError::new(format!(
                "account '{}' has no drafts mailbox",
                self.mail.lock().accounts[self.index].name
            ))),
        }
    }
}

/// A fake mailbox handle: either a real mailbox node or the account
/// surfacing at the top of a parent chain
enum Node {
    Mailbox(usize),
    AccountTop(usize),
}

struct FakeMailbox {
    mail: FakeMail,
    node: Node,
}

impl FakeMailbox {
    fn mailbox_index(&self) -> BridgeResult<usize> {
        match self.node {
            Node::Mailbox(i) => Ok(i),
            Node::AccountTop(_) => {
                Err(BridgeError::new("can't treat an account as a mailbox"))
            }
        }
    }
}

impl MailboxContainer for FakeMailbox {
    fn child_by_filter(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        let (account, parent) = match self.node {
            Node::Mailbox(i) => (self.mail.lock().mailboxes[i].account, Some(i)),
            Node::AccountTop(a) => (Some(a), None),
        };
        Ok(self
            .mail
            .child_lookup(account, parent, name, true)
            .map(|i| self.mail.mailbox_handle(i)))
    }

    fn child_by_name(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        let (account, parent) = match self.node {
            Node::Mailbox(i) => (self.mail.lock().mailboxes[i].account, Some(i)),
            Node::AccountTop(a) => (Some(a), None),
        };
        Ok(self
            .mail
            .child_lookup(account, parent, name, false)
            .map(|i| self.mail.mailbox_handle(i)))
    }

    fn children(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        let (account, parent) = match self.node {
            Node::Mailbox(i) => (self.mail.lock().mailboxes[i].account, Some(i)),
            Node::AccountTop(a) => (Some(a), None),
        };
        let indices: Vec<usize> = {
            let store = self.mail.lock();
            store
                .mailboxes
                .iter()
                .enumerate()
                .filter(|(_, m)| m.account == account && m.parent == parent)
                .map(|(i, _)| i)
                .collect()
        };
        Ok(indices.into_iter().map(|i| self.mail.mailbox_handle(i)).collect())
    }
}

impl Mailbox for FakeMailbox {
    fn name(&self) -> BridgeResult<String> {
        let store = self.mail.lock();
        Ok(match self.node {
            Node::Mailbox(i) => store.mailboxes[i].name.clone(),
            Node::AccountTop(a) => store.accounts[a].name.clone(),
        })
    }

    fn unread_count(&self) -> BridgeResult<i64> {
        let index = self.mailbox_index()?;
        Ok(self.mail.lock().mailboxes[index].unread)
    }

    fn container(&self) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        let index = match self.node {
            Node::Mailbox(i) => i,
            Node::AccountTop(_) => return Ok(None),
        };
        let store = self.mail.lock();
        let rec = &store.mailboxes[index];
        Ok(match (rec.parent, rec.account) {
            (Some(parent), _) => Some(Box::new(FakeMailbox {
                mail: self.mail.clone(),
                node: Node::Mailbox(parent),
            }) as Box<dyn Mailbox>),
            (None, Some(account)) => Some(Box::new(FakeMailbox {
                mail: self.mail.clone(),
                node: Node::AccountTop(account),
            }) as Box<dyn Mailbox>),
            (None, None) => None,
        })
    }

    fn messages(&self) -> BridgeResult<Box<dyn MessageBatch>> {
        let index = self.mailbox_index()?;
        let ids: Vec<i64> = {
            let store = self.mail.lock();
            store
                .messages
                .iter()
                .filter(|m| m.mailbox == index && !m.deleted)
                .map(|m| m.id)
                .collect()
        };
        Ok(Box::new(FakeBatch { mail: self.mail.clone(), ids }))
    }

    fn message_with_id(&self, id: MessageId) -> BridgeResult<Option<Box<dyn Message>>> {
        let index = self.mailbox_index()?;
        let store = self.mail.lock();
        if store.mailboxes[index].id_lookup_broken {
            return Err(BridgeError::new(format!(
                "can't get message id {id} of mailbox {}",
                store.mailboxes[index].name
            )));
        }
        let found = store
            .messages
            .iter()
            .any(|m| m.mailbox == index && m.id == id.0 && !m.deleted);
        Ok(found.then(|| {
            Box::new(FakeMessage { mail: self.mail.clone(), id: id.0 }) as Box<dyn Message>
        }))
    }

    fn delete_message(&self, id: MessageId) -> BridgeResult<()> {
        let index = self.mailbox_index()?;
        let mut store = self.mail.lock();
        match store
            .messages
            .iter_mut()
            .find(|m| m.mailbox == index && m.id == id.0 && !m.deleted)
        {
            Some(rec) => {
                rec.deleted = true;
                Ok(())
            }
            None => Err(BridgeError::new(format!("message {id} no longer exists"))),
        }
    }
}

/// Bulk-property snapshot of one mailbox's messages
///
/// Bulk arrays succeed even for poisoned messages, matching the store's
/// behavior where the column fetch works but per-object reads fail.
struct FakeBatch {
    mail: FakeMail,
    ids: Vec<i64>,
}

impl FakeBatch {
    fn column<T>(&self, f: impl Fn(&MessageRec) -> T) -> Vec<T> {
        let store = self.mail.lock();
        self.ids
            .iter()
            .filter_map(|id| store.messages.iter().find(|m| m.id == *id))
            .map(|rec| f(rec))
            .collect()
    }
}

impl MessageBatch for FakeBatch {
    fn len(&self) -> BridgeResult<usize> {
        Ok(self.ids.len())
    }

    fn subjects(&self) -> BridgeResult<Vec<Option<String>>> {
        Ok(self.column(|m| Some(m.subject.clone())))
    }

    fn senders(&self) -> BridgeResult<Vec<Option<String>>> {
        Ok(self.column(|m| Some(m.sender.clone())))
    }

    fn read_statuses(&self) -> BridgeResult<Vec<bool>> {
        Ok(self.column(|m| m.read))
    }

    fn flagged_statuses(&self) -> BridgeResult<Vec<bool>> {
        Ok(self.column(|m| m.flagged))
    }

    fn dates_received(&self) -> BridgeResult<Vec<Option<DateTime<Utc>>>> {
        Ok(self.column(|m| Some(m.date_received)))
    }

    fn message_at(&self, index: usize) -> BridgeResult<Box<dyn Message>> {
        let id = self
            .ids
            .get(index)
            .copied()
            .ok_or_else(|| BridgeError::new(format!("no message at index {index}")))?;
        Ok(Box::new(FakeMessage { mail: self.mail.clone(), id }))
    }
}

struct FakeMessage {
    mail: FakeMail,
    id: i64,
}

impl FakeMessage {
    fn with_rec<T>(&self, f: impl FnOnce(&MessageRec) -> T) -> BridgeResult<T> {
        let store = self.mail.lock();
        let rec = store
            .messages
            .iter()
            .find(|m| m.id == self.id && !m.deleted)
            .ok_or_else(|| BridgeError::new(format!("message {} no longer exists", self.id)))?;
        if rec.poisoned {
            return Err(BridgeError::new(format!(
                "can't get property of message {}",
                self.id
            )));
        }
        Ok(f(rec))
    }
}

impl Message for FakeMessage {
    fn id(&self) -> BridgeResult<MessageId> {
        self.with_rec(|m| MessageId(m.id))
    }

    fn subject(&self) -> BridgeResult<String> {
        self.with_rec(|m| m.subject.clone())
    }

    fn sender(&self) -> BridgeResult<String> {
        self.with_rec(|m| m.sender.clone())
    }

    fn date_received(&self) -> BridgeResult<DateTime<Utc>> {
        self.with_rec(|m| m.date_received)
    }

    fn date_sent(&self) -> BridgeResult<Option<DateTime<Utc>>> {
        self.with_rec(|m| m.date_sent)
    }

    fn read_status(&self) -> BridgeResult<bool> {
        self.with_rec(|m| m.read)
    }

    fn flagged_status(&self) -> BridgeResult<bool> {
        self.with_rec(|m| m.flagged)
    }

    fn junk_status(&self) -> BridgeResult<bool> {
        self.with_rec(|m| m.junk)
    }

    fn size(&self) -> BridgeResult<i64> {
        self.with_rec(|m| m.size)
    }

    fn content(&self) -> BridgeResult<String> {
        let content_poisoned = self.with_rec(|m| m.content_poisoned)?;
        if content_poisoned {
            return Err(BridgeError::new(format!(
                "can't get content of message {}",
                self.id
            )));
        }
        self.with_rec(|m| m.content.clone())
    }

    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>> {
        self.with_rec(|m| match field {
            RecipientField::To => m.to.clone(),
            RecipientField::Cc => m.cc.clone(),
            RecipientField::Bcc => m.bcc.clone(),
        })
    }

    fn mailbox(&self) -> BridgeResult<Box<dyn Mailbox>> {
        let index = self.with_rec(|m| m.mailbox)?;
        Ok(self.mail.mailbox_handle(index))
    }
}

struct FakeOutgoing {
    mail: FakeMail,
    id: i64,
}

impl FakeOutgoing {
    fn with_rec<T>(&self, f: impl FnOnce(&OutgoingRec) -> T) -> BridgeResult<T> {
        let store = self.mail.lock();
        store
            .outgoing
            .iter()
            .find(|o| o.id == self.id && !o.deleted)
            .map(f)
            .ok_or_else(|| {
                BridgeError::new(format!("outgoing message {} no longer exists", self.id))
            })
    }

    fn with_rec_mut<T>(&self, f: impl FnOnce(&mut OutgoingRec) -> T) -> BridgeResult<T> {
        let mut store = self.mail.lock();
        store
            .outgoing
            .iter_mut()
            .find(|o| o.id == self.id && !o.deleted)
            .map(f)
            .ok_or_else(|| {
                BridgeError::new(format!("outgoing message {} no longer exists", self.id))
            })
    }
}

impl OutgoingMessage for FakeOutgoing {
    fn id(&self) -> BridgeResult<OutgoingId> {
        self.with_rec(|o| OutgoingId(o.id))
    }

    fn subject(&self) -> BridgeResult<String> {
        self.with_rec(|o| o.subject.clone())
    }

    fn sender(&self) -> BridgeResult<String> {
        self.with_rec(|o| o.sender.clone())
    }

    fn content(&self) -> BridgeResult<String> {
        self.with_rec(|o| o.content.clone())
    }

    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>> {
        self.with_rec(|o| match field {
            RecipientField::To => o.to.clone(),
            RecipientField::Cc => o.cc.clone(),
            RecipientField::Bcc => o.bcc.clone(),
        })
    }

    fn append_recipient(&self, field: RecipientField, address: &str) -> BridgeResult<()> {
        let rejected = self.mail.lock().rejected_addresses.contains(address);
        if rejected {
            return Err(BridgeError::new(format!(
                "Mail got an error: Can't make \"{address}\" into type recipient."
            )));
        }
        self.with_rec_mut(|o| {
            let list = match field {
                RecipientField::To => &mut o.to,
                RecipientField::Cc => &mut o.cc,
                RecipientField::Bcc => &mut o.bcc,
            };
            list.push(address.to_owned());
        })
    }

    fn set_content(&self, text: &str) -> BridgeResult<()> {
        self.with_rec_mut(|o| o.content = text.to_owned())
    }

    fn save(&self) -> BridgeResult<()> {
        self.with_rec_mut(|o| o.saved = true)
    }
}

#[cfg(test)]
mod tests {
    use crate::bridge::{
        MailApp, Mailbox, MailboxContainer, Message, MessageBatch, OutgoingMessage,
        RecipientField,
    };

    use super::{FakeMail, MessageSpec};

    #[test]
    fn deleted_outgoing_disappears_from_lookups() {
        let mail = FakeMail::new();
        let msg = mail
            .make_outgoing(&crate::bridge::OutgoingInit {
                subject: "x".to_owned(),
                sender: None,
                visible: false,
            })
            .expect("make succeeds");
        let id = msg.id().expect("id readable");
        mail.delete_outgoing(id).expect("delete succeeds");
        assert!(mail.outgoing_with_id(id).expect("lookup succeeds").is_none());
        assert_eq!(mail.open_outgoing_count(), 0);
    }

    #[test]
    fn rejected_address_fails_only_that_append() {
        let mail = FakeMail::new();
        mail.reject_address("bad@@example");
        let msg = mail
            .make_outgoing(&crate::bridge::OutgoingInit {
                subject: "x".to_owned(),
                sender: None,
                visible: false,
            })
            .expect("make succeeds");
        assert!(msg.append_recipient(RecipientField::To, "ok@example.com").is_ok());
        assert!(msg.append_recipient(RecipientField::To, "bad@@example").is_err());
        assert_eq!(
            msg.recipients(RecipientField::To).expect("readable"),
            vec!["ok@example.com".to_owned()]
        );
    }

    #[test]
    fn poisoned_message_fails_property_reads_but_not_bulk_columns() {
        let mail = FakeMail::new();
        let account = mail.add_account("Work");
        let inbox = mail.add_mailbox(account, &["Inbox"]);
        let id = mail.add_message(inbox, MessageSpec::new("hello", "a@example.com"));
        mail.poison_message(id);

        let accounts = mail.accounts().expect("accounts readable");
        let mailbox = accounts[0]
            .child_by_name("Inbox")
            .expect("lookup succeeds")
            .expect("inbox exists");
        let batch = mailbox.messages().expect("batch opens");
        assert_eq!(batch.subjects().expect("bulk works").len(), 1);
        let msg = batch.message_at(0).expect("handle exists");
        assert!(msg.subject().is_err());
    }
}
