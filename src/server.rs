//! MCP server implementation with tool handlers
//!
//! Registers 12 MCP tools over the scripting bridge. Tool handlers are thin:
//! each one runs its operation from `ops` on the blocking pool and wraps the
//! outcome in the uniform result envelope. Operation failures travel inside
//! the envelope with `success: false`; they never surface as MCP protocol
//! errors.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorData, ServerCapabilities, ServerInfo};
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Serialize;

use crate::bridge::MailApp;
use crate::config::ServerConfig;
use crate::envelope::{Envelope, OpLog};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AccountInput, AccountListData, CreateOutgoingMessageInput, DeleteDraftInput,
    DeleteDraftData, DeleteOutgoingData, DeleteOutgoingMessageInput, FindMessagesData,
    FindMessagesInput, GetMessageContentInput, GetSelectedMessagesInput, ListAccountsInput,
    ListDraftsData, ListDraftsInput, MailboxListData, MessageDetail, OutgoingMessageData,
    ReplaceOutgoingData, ReplaceOutgoingMessageInput, ReplyData, ReplyToMessageInput,
    SelectedMessagesData, UnreadMailboxesData,
};
use crate::ops;

/// Apple Mail MCP server
///
/// Holds shared configuration and the scripting bridge. Implements MCP tool
/// handlers via the `#[tool]` attribute macro and the `ServerHandler` trait.
#[derive(Clone)]
pub struct AppleMailServer {
    /// Server config (timeouts, write flag, drafts aliases)
    config: Arc<ServerConfig>,
    /// Scripting bridge; every operation goes through this
    app: Arc<dyn MailApp>,
    /// Tool router for dispatching MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AppleMailServer {
    /// Create a new MCP server instance over the given bridge
    pub fn new(config: ServerConfig, app: Arc<dyn MailApp>) -> Self {
        Self {
            config: Arc::new(config),
            app,
            tool_router: Self::tool_router(),
        }
    }

    /// Run one operation on the blocking pool and envelope the outcome
    ///
    /// Bridge calls are synchronous subprocess invocations, so handlers must
    /// not run them on the async executor directly.
    async fn run_tool<T, F>(&self, op: F) -> Result<Json<Envelope<T>>, ErrorData>
    where
        T: Serialize + JsonSchema + Send + 'static,
        F: FnOnce(&dyn MailApp, &mut OpLog) -> AppResult<T> + Send + 'static,
    {
        let app = Arc::clone(&self.app);
        let envelope = tokio::task::spawn_blocking(move || {
            let mut log = OpLog::new();
            match op(app.as_ref(), &mut log) {
                Ok(data) => Envelope::ok(data, log),
                Err(e) => Envelope::fail(&e, log),
            }
        })
        .await
        .map_err(|e| ErrorData::internal_error(format!("tool task failed: {e}"), None))?;
        Ok(Json(envelope))
    }

    /// Gate check for mutating tools
    fn write_gate(&self) -> AppResult<()> {
        if !self.config.write_enabled {
            return Err(AppError::invalid(
                "Write operations are disabled. Set APPLE_MAIL_WRITE_ENABLED=true to enable them.",
            ));
        }
        Ok(())
    }

    /// Tool: List email accounts configured in Mail.app
    #[tool(
        name = "list_accounts",
        description = "Lists all email accounts configured in Apple Mail, with addresses and mailbox counts."
    )]
    async fn list_accounts(
        &self,
        Parameters(input): Parameters<ListAccountsInput>,
    ) -> Result<Json<Envelope<AccountListData>>, ErrorData> {
        self.run_tool(move |app, log| ops::list_accounts(app, &input, log))
            .await
    }

    /// Tool: List mailboxes of one account
    #[tool(
        name = "list_mailboxes",
        description = "Lists all mailboxes (folders) for a specific account in Apple Mail."
    )]
    async fn list_mailboxes(
        &self,
        Parameters(input): Parameters<AccountInput>,
    ) -> Result<Json<Envelope<MailboxListData>>, ErrorData> {
        self.run_tool(move |app, log| ops::list_mailboxes(app, &input, log))
            .await
    }

    /// Tool: Find mailboxes with unread messages
    #[tool(
        name = "find_unread_mailboxes",
        description = "Finds all mailboxes in a given account that have unread messages."
    )]
    async fn find_unread_mailboxes(
        &self,
        Parameters(input): Parameters<AccountInput>,
    ) -> Result<Json<Envelope<UnreadMailboxesData>>, ErrorData> {
        self.run_tool(move |app, log| ops::find_unread_mailboxes(app, &input, log))
            .await
    }

    /// Tool: Search messages in one mailbox
    #[tool(
        name = "find_messages",
        description = "Searches messages in a specific mailbox by subject, sender, read status, flag status, and date range. Returns the first page of matches in mailbox order."
    )]
    async fn find_messages(
        &self,
        Parameters(input): Parameters<FindMessagesInput>,
    ) -> Result<Json<Envelope<FindMessagesData>>, ErrorData> {
        self.run_tool(move |app, log| ops::find_messages(app, &input, log))
            .await
    }

    /// Tool: Get full content of one message
    #[tool(
        name = "get_message_content",
        description = "Retrieves the full content (body) of a specific message by its ID from a specific account and mailbox."
    )]
    async fn get_message_content(
        &self,
        Parameters(input): Parameters<GetMessageContentInput>,
    ) -> Result<Json<Envelope<MessageDetail>>, ErrorData> {
        self.run_tool(move |app, log| ops::get_message_content(app, &input, log))
            .await
    }

    /// Tool: List drafts of one account
    #[tool(
        name = "list_drafts",
        description = "Lists draft messages in the drafts mailbox of a specific account."
    )]
    async fn list_drafts(
        &self,
        Parameters(input): Parameters<ListDraftsInput>,
    ) -> Result<Json<Envelope<ListDraftsData>>, ErrorData> {
        self.run_tool(move |app, log| ops::list_drafts(app, &input, log))
            .await
    }

    /// Tool: Get the current viewer selection
    #[tool(
        name = "get_selected_messages",
        description = "Gets the currently selected message(s) in the frontmost Mail viewer window. Use the mailbox_path field of the result with other tools."
    )]
    async fn get_selected_messages(
        &self,
        Parameters(input): Parameters<GetSelectedMessagesInput>,
    ) -> Result<Json<Envelope<SelectedMessagesData>>, ErrorData> {
        self.run_tool(move |app, log| ops::get_selected_messages(app, &input, log))
            .await
    }

    /// Tool: Create an outgoing message
    ///
    /// The message is saved, not sent. Requires
    /// `APPLE_MAIL_WRITE_ENABLED=true` (the default).
    #[tool(
        name = "create_outgoing_message",
        description = "Creates a new outgoing email message and returns its ID immediately. The message is saved but not sent; use replace_outgoing_message to modify it. The message only exists while Mail.app keeps running."
    )]
    async fn create_outgoing_message(
        &self,
        Parameters(input): Parameters<CreateOutgoingMessageInput>,
    ) -> Result<Json<Envelope<OutgoingMessageData>>, ErrorData> {
        let gate = self.write_gate();
        self.run_tool(move |app, log| {
            gate?;
            ops::create_outgoing_message(app, &input, log)
        })
        .await
    }

    /// Tool: Replace an outgoing message
    #[tool(
        name = "replace_outgoing_message",
        description = "Replaces an outgoing message by deleting it and creating a new one with updated properties. Fields set to \"__KEEP__\" (or [\"__KEEP__\"] for recipient lists) keep their current value. Returns the new message ID."
    )]
    async fn replace_outgoing_message(
        &self,
        Parameters(input): Parameters<ReplaceOutgoingMessageInput>,
    ) -> Result<Json<Envelope<ReplaceOutgoingData>>, ErrorData> {
        let gate = self.write_gate();
        self.run_tool(move |app, log| {
            gate?;
            ops::replace_outgoing_message(app, &input, log)
        })
        .await
    }

    /// Tool: Delete an outgoing message
    #[tool(
        name = "delete_outgoing_message",
        description = "Deletes an outgoing message (an open compose window) by its ID without sending it."
    )]
    async fn delete_outgoing_message(
        &self,
        Parameters(input): Parameters<DeleteOutgoingMessageInput>,
    ) -> Result<Json<Envelope<DeleteOutgoingData>>, ErrorData> {
        let gate = self.write_gate();
        self.run_tool(move |app, log| {
            gate?;
            ops::delete_outgoing_message(app, &input, log)
        })
        .await
    }

    /// Tool: Delete a saved draft
    #[tool(
        name = "delete_draft",
        description = "Deletes a draft message by its ID. Searches the drafts mailbox of every account, then local drafts mailboxes."
    )]
    async fn delete_draft(
        &self,
        Parameters(input): Parameters<DeleteDraftInput>,
    ) -> Result<Json<Envelope<DeleteDraftData>>, ErrorData> {
        let gate = self.write_gate();
        let aliases = self.config.drafts_aliases.clone();
        self.run_tool(move |app, log| {
            gate?;
            ops::delete_draft(app, &aliases, &input, log)
        })
        .await
    }

    /// Tool: Reply to a message, saved as a draft
    #[tool(
        name = "reply_to_message",
        description = "Creates a reply to a specific message and saves it as a draft. The reply is not sent; it remains in drafts for review. Use the mailbox_path field from get_selected_messages output, not the mailbox field."
    )]
    async fn reply_to_message(
        &self,
        Parameters(input): Parameters<ReplyToMessageInput>,
    ) -> Result<Json<Envelope<ReplyData>>, ErrorData> {
        let gate = self.write_gate();
        self.run_tool(move |app, log| {
            gate?;
            ops::reply_to_message(app, &input, log)
        })
        .await
    }
}

/// MCP server handler implementation
///
/// Provides server info and capabilities to the MCP client.
#[tool_handler(router = self.tool_router)]
impl ServerHandler for AppleMailServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Apple Mail automation server. Requires Mail.app to be running and automation consent granted. Read tools are always available; write tools require APPLE_MAIL_WRITE_ENABLED=true (the default).".to_owned(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}
