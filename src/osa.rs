//! Production scripting bridge over `osascript -l JavaScript`
//!
//! Every handle is an object-specifier expression rooted at
//! `Application("Mail")`, kept as a string and re-evaluated on each call.
//! One call means one `osascript` subprocess: the script wraps the
//! expression in try/catch and prints a `{success, data|error}` JSON
//! envelope on stdout, so application errors come back as text for the
//! classifier instead of as exit codes.
//!
//! Specifiers are lazy: a handle can stop resolving between calls (mailbox
//! removed, compose window closed, Mail.app restarted), which surfaces as a
//! caught script error.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::bridge::{
    Account, BridgeError, BridgeResult, MailApp, Mailbox, MailboxContainer, Message, MessageBatch,
    OutgoingInit, OutgoingMessage, RecipientField,
};
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::ids::{MessageId, OutgoingId};

/// Poll interval while waiting for the subprocess
const WAIT_POLL: Duration = Duration::from_millis(25);

/// Envelope every evaluated script prints on stdout
#[derive(Debug, Deserialize)]
struct OsaEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared subprocess runner with the configured script timeout
struct Runner {
    timeout: Duration,
}

impl Runner {
    /// Evaluate a JavaScript function body against the Mail application
    ///
    /// `body` runs with `Mail` in scope and must `return` its result; the
    /// returned value is carried back as JSON.
    fn eval(&self, body: &str) -> BridgeResult<Value> {
        let script = format!(
            "function run() {{\n\
             const Mail = Application(\"Mail\");\n\
             Mail.includeStandardAdditions = true;\n\
             try {{\n\
             const data = (() => {{ {body} }})();\n\
             return JSON.stringify({{ success: true, data: data === undefined ? null : data }});\n\
             }} catch (e) {{\n\
             return JSON.stringify({{ success: false, error: e.toString() }});\n\
             }}\n\
             }}"
        );
        let output = self.run_osascript(&script)?;
        let envelope: OsaEnvelope = serde_json::from_slice(&output).map_err(|e| {
            BridgeError::new(format!(
                "failed to parse osascript output: {e}; raw output: {}",
                String::from_utf8_lossy(&output)
            ))
        })?;
        if !envelope.success {
            return Err(BridgeError::new(
                envelope
                    .error
                    .unwrap_or_else(|| "script returned success=false with no error message".to_owned()),
            ));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Evaluate and deserialize the data payload
    fn eval_as<T: serde::de::DeserializeOwned>(&self, body: &str) -> BridgeResult<T> {
        let data = self.eval(body)?;
        serde_json::from_value(data.clone())
            .map_err(|e| BridgeError::new(format!("unexpected script payload {data}: {e}")))
    }

    /// Run one `osascript` subprocess, killing it at the timeout
    fn run_osascript(&self, script: &str) -> BridgeResult<Vec<u8>> {
        let mut child = Command::new("osascript")
            .arg("-l")
            .arg("JavaScript")
            .arg("-e")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BridgeError::new(format!("failed to spawn osascript: {e}")))?;

        // Drain both pipes on threads so a chatty script can't deadlock on
        // a full pipe buffer while we poll for exit.
        let stdout = spawn_drain(child.stdout.take());
        let stderr = spawn_drain(child.stderr.take());

        let status = self.wait_with_timeout(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status_success(status) {
            let detail = String::from_utf8_lossy(&stderr);
            let detail = detail.trim();
            if detail.is_empty() {
                return Err(BridgeError::new(format!(
                    "osascript execution failed with {status:?}"
                )));
            }
            // stderr carries the interesting text for automation-consent
            // failures (-1743/-1744) and not-running (-600) conditions.
            return Err(BridgeError::new(format!(
                "osascript execution failed: {detail}"
            )));
        }
        if stdout.is_empty() {
            return Err(BridgeError::new(
                "osascript returned empty output (expected JSON)",
            ));
        }
        Ok(stdout)
    }

    fn wait_with_timeout(&self, child: &mut Child) -> BridgeResult<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BridgeError::new(format!(
                            "osascript timed out after {} ms",
                            self.timeout.as_millis()
                        )));
                    }
                    thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    return Err(BridgeError::new(format!("failed to wait for osascript: {e}")))
                }
            }
        }
    }
}

fn spawn_drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn status_success(status: std::process::ExitStatus) -> bool {
    status.success()
}

/// JSON-escape a string for inline embedding in a script
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_owned())
}

/// Result payload of the startup connectivity check
#[derive(Debug, Deserialize)]
pub struct StartupInfo {
    #[serde(rename = "accountCount")]
    pub account_count: i64,
    pub version: String,
}

/// The live Mail.app bridge
pub struct OsaBridge {
    runner: Arc<Runner>,
    startup_timeout: Duration,
}

impl OsaBridge {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            runner: Arc::new(Runner {
                timeout: Duration::from_millis(config.script_timeout_ms),
            }),
            startup_timeout: Duration::from_millis(config.startup_timeout_ms),
        }
    }

    /// Verify Mail.app is running and scriptable
    ///
    /// Uses the shorter startup timeout so a missing automation consent
    /// prompt does not stall server start for the full script timeout.
    pub fn startup_check(&self) -> AppResult<StartupInfo> {
        let runner = Runner {
            timeout: self.startup_timeout,
        };
        let info: StartupInfo = runner
            .eval_as(
                "if (!Mail.running()) { \
                 throw new Error(\"application is not running\"); \
                 } \
                 return { accountCount: Mail.accounts().length, version: Mail.version() };",
            )
            .map_err(|e| AppError::classify(&e.to_string()))?;
        debug!(
            accounts = info.account_count,
            version = %info.version,
            "Mail.app startup check passed"
        );
        Ok(info)
    }

    fn account_handle(&self, spec: String) -> Box<dyn Account> {
        Box::new(OsaAccount {
            runner: Arc::clone(&self.runner),
            spec,
        })
    }

    fn outgoing_handle(&self, id: OutgoingId) -> Box<dyn OutgoingMessage> {
        Box::new(OsaOutgoing {
            runner: Arc::clone(&self.runner),
            spec: outgoing_spec(id),
        })
    }
}

fn outgoing_spec(id: OutgoingId) -> String {
    format!("Mail.outgoingMessages.whose({{ id: {id} }})[0]")
}

/// whose-predicate disjunction over mailbox names
fn name_disjunction(names: &[String]) -> String {
    let alternatives: Vec<String> = names
        .iter()
        .map(|n| format!("{{ name: {} }}", js_str(n)))
        .collect();
    format!("{{ _or: [{}] }}", alternatives.join(", "))
}

impl MailApp for OsaBridge {
    fn running(&self) -> BridgeResult<bool> {
        self.runner.eval_as("return Mail.running();")
    }

    fn version(&self) -> BridgeResult<String> {
        self.runner.eval_as("return Mail.version();")
    }

    fn accounts(&self) -> BridgeResult<Vec<Box<dyn Account>>> {
        let count: usize = self.runner.eval_as("return Mail.accounts().length;")?;
        Ok((0..count)
            .map(|i| self.account_handle(format!("Mail.accounts[{i}]")))
            .collect())
    }

    fn account_named(&self, name: &str) -> BridgeResult<Option<Box<dyn Account>>> {
        let filter = format!("Mail.accounts.whose({{ name: {} }})", js_str(name));
        let count: usize = self.runner.eval_as(&format!("return {filter}().length;"))?;
        Ok((count > 0).then(|| self.account_handle(format!("{filter}[0]"))))
    }

    fn local_mailboxes_named(&self, names: &[String]) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        let filter = format!("Mail.mailboxes.whose({})", name_disjunction(names));
        let count: usize = self.runner.eval_as(&format!("return {filter}().length;"))?;
        Ok((0..count)
            .map(|i| mailbox_handle(&self.runner, format!("{filter}[{i}]")))
            .collect())
    }

    fn outgoing_messages(&self) -> BridgeResult<Vec<Box<dyn OutgoingMessage>>> {
        let ids: Vec<i64> = self
            .runner
            .eval_as("return Mail.outgoingMessages().map((m) => m.id());")?;
        Ok(ids
            .into_iter()
            .map(|id| self.outgoing_handle(OutgoingId(id)))
            .collect())
    }

    fn outgoing_with_id(&self, id: OutgoingId) -> BridgeResult<Option<Box<dyn OutgoingMessage>>> {
        let count: usize = self.runner.eval_as(&format!(
            "return Mail.outgoingMessages.whose({{ id: {id} }})().length;"
        ))?;
        Ok((count > 0).then(|| self.outgoing_handle(id)))
    }

    fn make_outgoing(&self, init: &OutgoingInit) -> BridgeResult<Box<dyn OutgoingMessage>> {
        let sender_line = match &init.sender {
            Some(sender) => format!("props.sender = {};", js_str(sender)),
            None => String::new(),
        };
        let id: i64 = self.runner.eval_as(&format!(
            "const props = {{ subject: {subject}, visible: {visible} }}; \
             {sender_line} \
             const msg = Mail.make({{ new: \"outgoingMessage\", withProperties: props }}); \
             return msg.id();",
            subject = js_str(&init.subject),
            visible = init.visible,
        ))?;
        Ok(self.outgoing_handle(OutgoingId(id)))
    }

    fn delete_outgoing(&self, id: OutgoingId) -> BridgeResult<()> {
        let _: bool = self.runner.eval_as(&format!(
            "const matches = Mail.outgoingMessages.whose({{ id: {id} }})(); \
             if (matches.length === 0) {{ throw new Error(\"outgoing message {id} no longer exists\"); }} \
             Mail.delete(matches[0]); \
             return true;"
        ))?;
        Ok(())
    }

    fn selected_messages(&self) -> BridgeResult<Vec<Box<dyn Message>>> {
        let count: usize = self.runner.eval_as(
            "const viewers = Mail.messageViewers(); \
             if (!viewers || viewers.length === 0) { return 0; } \
             const selected = viewers[0].selectedMessages(); \
             return selected ? selected.length : 0;",
        )?;
        Ok((0..count)
            .map(|i| {
                message_handle(
                    &self.runner,
                    format!("Mail.messageViewers[0].selectedMessages[{i}]"),
                )
            })
            .collect())
    }
}

fn mailbox_handle(runner: &Arc<Runner>, spec: String) -> Box<dyn Mailbox> {
    Box::new(OsaMailbox {
        runner: Arc::clone(runner),
        spec,
    })
}

fn message_handle(runner: &Arc<Runner>, spec: String) -> Box<dyn Message> {
    Box::new(OsaMessage {
        runner: Arc::clone(runner),
        spec,
    })
}

struct OsaAccount {
    runner: Arc<Runner>,
    spec: String,
}

impl OsaAccount {
    fn get<T: serde::de::DeserializeOwned>(&self, property: &str) -> BridgeResult<T> {
        self.runner
            .eval_as(&format!("return {}.{property}();", self.spec))
    }
}

impl MailboxContainer for OsaAccount {
    fn child_by_filter(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        child_by_filter(&self.runner, &self.spec, name)
    }

    fn child_by_name(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        child_by_name(&self.runner, &self.spec, name)
    }

    fn children(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        children(&self.runner, &self.spec)
    }
}

impl Account for OsaAccount {
    fn name(&self) -> BridgeResult<String> {
        self.get("name")
    }

    fn enabled(&self) -> BridgeResult<bool> {
        self.get("enabled")
    }

    fn email_addresses(&self) -> BridgeResult<Vec<String>> {
        self.get("emailAddresses")
    }

    fn full_name(&self) -> BridgeResult<String> {
        self.get("fullName")
    }

    fn all_mailboxes(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        // Flat enumeration, depth-first over the tree, in store order per
        // level. Account-level `mailboxes` only yields top-level nodes.
        let count: usize = self.runner.eval_as(&format!(
            "let total = 0; \
             const walk = (box) => {{ total += 1; box.mailboxes().forEach(walk); }}; \
             {}.mailboxes().forEach(walk); \
             return total;",
            self.spec
        ))?;
        // Handles address the flattened walk positionally through a shared
        // helper expression evaluated per call.
        Ok((0..count)
            .map(|i| {
                mailbox_handle(
                    &self.runner,
                    format!(
                        "(() => {{ const flat = []; \
                         const walk = (box) => {{ flat.push(box); box.mailboxes().forEach(walk); }}; \
                         {}.mailboxes().forEach(walk); \
                         return flat[{i}]; }})()",
                        self.spec
                    ),
                )
            })
            .collect())
    }

    fn drafts_mailbox(&self) -> BridgeResult<Box<dyn Mailbox>> {
        let spec = format!("{}.draftsMailbox", self.spec);
        // Specifiers resolve lazily; touch a property so account types
        // without a drafts mailbox fail here, not on first use.
        let _: String = self.runner.eval_as(&format!("return {spec}.name();"))?;
        Ok(mailbox_handle(&self.runner, spec))
    }
}

fn child_by_filter(
    runner: &Arc<Runner>,
    spec: &str,
    name: &str,
) -> BridgeResult<Option<Box<dyn Mailbox>>> {
    let filter = format!("{spec}.mailboxes.whose({{ name: {} }})", js_str(name));
    let count: usize = runner.eval_as(&format!("return {filter}().length;"))?;
    Ok((count > 0).then(|| mailbox_handle(runner, format!("{filter}[0]"))))
}

fn child_by_name(
    runner: &Arc<Runner>,
    spec: &str,
    name: &str,
) -> BridgeResult<Option<Box<dyn Mailbox>>> {
    let child = format!("{spec}.mailboxes.byName({})", js_str(name));
    // The name-indexed form hands out specifiers for absent names; verify
    // the reference resolves before returning a handle.
    let resolves: bool = runner.eval_as(&format!(
        "try {{ {child}.name(); return true; }} catch (e) {{ return false; }}"
    ))?;
    Ok(resolves.then(|| mailbox_handle(runner, child)))
}

fn children(runner: &Arc<Runner>, spec: &str) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
    let count: usize = runner.eval_as(&format!("return {spec}.mailboxes().length;"))?;
    Ok((0..count)
        .map(|i| mailbox_handle(runner, format!("{spec}.mailboxes[{i}]")))
        .collect())
}

struct OsaMailbox {
    runner: Arc<Runner>,
    spec: String,
}

impl MailboxContainer for OsaMailbox {
    fn child_by_filter(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        child_by_filter(&self.runner, &self.spec, name)
    }

    fn child_by_name(&self, name: &str) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        child_by_name(&self.runner, &self.spec, name)
    }

    fn children(&self) -> BridgeResult<Vec<Box<dyn Mailbox>>> {
        children(&self.runner, &self.spec)
    }
}

impl Mailbox for OsaMailbox {
    fn name(&self) -> BridgeResult<String> {
        self.runner.eval_as(&format!("return {}.name();", self.spec))
    }

    fn unread_count(&self) -> BridgeResult<i64> {
        self.runner
            .eval_as(&format!("return {}.unreadCount();", self.spec))
    }

    fn container(&self) -> BridgeResult<Option<Box<dyn Mailbox>>> {
        // The container of a top-level mailbox is the account; asking the
        // account for its container throws. Map the throw to `None`.
        let resolves: bool = self.runner.eval_as(&format!(
            "try {{ {}.container().name(); return true; }} catch (e) {{ return false; }}",
            self.spec
        ))?;
        Ok(resolves.then(|| mailbox_handle(&self.runner, format!("{}.container", self.spec))))
    }

    fn messages(&self) -> BridgeResult<Box<dyn MessageBatch>> {
        Ok(Box::new(OsaBatch {
            runner: Arc::clone(&self.runner),
            spec: format!("{}.messages", self.spec),
        }))
    }

    fn message_with_id(&self, id: MessageId) -> BridgeResult<Option<Box<dyn Message>>> {
        let filter = format!("{}.messages.whose({{ id: {id} }})", self.spec);
        let count: usize = self.runner.eval_as(&format!("return {filter}().length;"))?;
        Ok((count > 0).then(|| message_handle(&self.runner, format!("{filter}[0]"))))
    }

    fn delete_message(&self, id: MessageId) -> BridgeResult<()> {
        let _: bool = self.runner.eval_as(&format!(
            "const matches = {}.messages.whose({{ id: {id} }})(); \
             if (matches.length === 0) {{ throw new Error(\"message {id} no longer exists\"); }} \
             Mail.delete(matches[0]); \
             return true;",
            self.spec
        ))?;
        Ok(())
    }
}

struct OsaBatch {
    runner: Arc<Runner>,
    spec: String,
}

impl OsaBatch {
    /// Bulk-fetch one property column across the collection
    fn column<T: serde::de::DeserializeOwned>(&self, property: &str) -> BridgeResult<Vec<T>> {
        self.runner
            .eval_as(&format!("return {}.{property}();", self.spec))
    }
}

impl MessageBatch for OsaBatch {
    fn len(&self) -> BridgeResult<usize> {
        self.runner.eval_as(&format!("return {}().length;", self.spec))
    }

    fn subjects(&self) -> BridgeResult<Vec<Option<String>>> {
        self.column("subject")
    }

    fn senders(&self) -> BridgeResult<Vec<Option<String>>> {
        self.column("sender")
    }

    fn read_statuses(&self) -> BridgeResult<Vec<bool>> {
        self.column("readStatus")
    }

    fn flagged_statuses(&self) -> BridgeResult<Vec<bool>> {
        self.column("flaggedStatus")
    }

    fn dates_received(&self) -> BridgeResult<Vec<Option<DateTime<Utc>>>> {
        let raw: Vec<Option<String>> = self.column("dateReceived")?;
        Ok(raw.into_iter().map(|v| v.and_then(parse_osa_date)).collect())
    }

    fn message_at(&self, index: usize) -> BridgeResult<Box<dyn Message>> {
        Ok(message_handle(&self.runner, format!("{}[{index}]", self.spec)))
    }
}

struct OsaMessage {
    runner: Arc<Runner>,
    spec: String,
}

impl OsaMessage {
    fn get<T: serde::de::DeserializeOwned>(&self, property: &str) -> BridgeResult<T> {
        self.runner
            .eval_as(&format!("return {}.{property}();", self.spec))
    }
}

impl Message for OsaMessage {
    fn id(&self) -> BridgeResult<MessageId> {
        self.get("id")
    }

    fn subject(&self) -> BridgeResult<String> {
        self.get("subject")
    }

    fn sender(&self) -> BridgeResult<String> {
        self.get("sender")
    }

    fn date_received(&self) -> BridgeResult<DateTime<Utc>> {
        let raw: String = self.get("dateReceived")?;
        parse_osa_date(raw.clone())
            .ok_or_else(|| BridgeError::new(format!("unparseable dateReceived: {raw}")))
    }

    fn date_sent(&self) -> BridgeResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self.get("dateSent")?;
        Ok(raw.and_then(parse_osa_date))
    }

    fn read_status(&self) -> BridgeResult<bool> {
        self.get("readStatus")
    }

    fn flagged_status(&self) -> BridgeResult<bool> {
        self.get("flaggedStatus")
    }

    fn junk_status(&self) -> BridgeResult<bool> {
        self.get("junkMailStatus")
    }

    fn size(&self) -> BridgeResult<i64> {
        self.get("messageSize")
    }

    fn content(&self) -> BridgeResult<String> {
        self.get("content")
    }

    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>> {
        self.runner.eval_as(&format!(
            "return {}.{}().map((r) => r.address());",
            self.spec,
            recipient_collection(field)
        ))
    }

    fn mailbox(&self) -> BridgeResult<Box<dyn Mailbox>> {
        Ok(mailbox_handle(&self.runner, format!("{}.mailbox", self.spec)))
    }
}

struct OsaOutgoing {
    runner: Arc<Runner>,
    spec: String,
}

impl OutgoingMessage for OsaOutgoing {
    fn id(&self) -> BridgeResult<OutgoingId> {
        self.runner.eval_as(&format!("return {}.id();", self.spec))
    }

    fn subject(&self) -> BridgeResult<String> {
        self.runner.eval_as(&format!("return {}.subject();", self.spec))
    }

    fn sender(&self) -> BridgeResult<String> {
        self.runner.eval_as(&format!("return {}.sender();", self.spec))
    }

    fn content(&self) -> BridgeResult<String> {
        self.runner.eval_as(&format!("return {}.content();", self.spec))
    }

    fn recipients(&self, field: RecipientField) -> BridgeResult<Vec<String>> {
        self.runner.eval_as(&format!(
            "return {}.{}().map((r) => r.address());",
            self.spec,
            recipient_collection(field)
        ))
    }

    fn append_recipient(&self, field: RecipientField, address: &str) -> BridgeResult<()> {
        let constructor = match field {
            RecipientField::To => "Mail.ToRecipient",
            RecipientField::Cc => "Mail.CcRecipient",
            RecipientField::Bcc => "Mail.BccRecipient",
        };
        let _: bool = self.runner.eval_as(&format!(
            "const recip = {constructor}({{ address: {} }}); \
             {}.{}.push(recip); \
             return true;",
            js_str(address),
            self.spec,
            recipient_collection(field),
        ))?;
        Ok(())
    }

    fn set_content(&self, text: &str) -> BridgeResult<()> {
        // A plain string cannot be assigned to the content property; the
        // text goes in as a paragraph at the content root.
        let _: bool = self.runner.eval_as(&format!(
            "Mail.make({{ new: \"paragraph\", withData: {}, at: {}.content }}); return true;",
            js_str(text),
            self.spec,
        ))?;
        Ok(())
    }

    fn save(&self) -> BridgeResult<()> {
        let _: bool = self
            .runner
            .eval_as(&format!("{}.save(); return true;", self.spec))?;
        Ok(())
    }
}

fn recipient_collection(field: RecipientField) -> &'static str {
    match field {
        RecipientField::To => "toRecipients",
        RecipientField::Cc => "ccRecipients",
        RecipientField::Bcc => "bccRecipients",
    }
}

/// Parse the ISO-8601 form `JSON.stringify` gives a JavaScript `Date`
fn parse_osa_date(raw: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
