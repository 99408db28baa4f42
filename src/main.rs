//! apple-mail-mcp-rs: Apple Mail automation MCP server
//!
//! Exposes Mail.app automation via the Model Context Protocol, served over
//! stdio (default) or streamable HTTP. All mail access goes through an
//! `osascript` scripting bridge; every tool call returns a uniform result
//! envelope with failures carried inside it.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with transport selection and startup check
//! - [`config`]: Environment-driven configuration and CLI options
//! - [`errors`]: Application error taxonomy with heuristic bridge-error classification
//! - [`envelope`]: Uniform result envelope and per-operation diagnostic log
//! - [`ids`]: Message and outgoing-message id newtypes
//! - [`bridge`]: Trait seam over the Mail scripting object store
//! - [`osa`]: Production bridge over `osascript -l JavaScript`
//! - [`resolve`]: Account and mailbox path resolution
//! - [`filter`]: Compound message predicate
//! - [`query`]: Mailbox query engine with first-page pagination
//! - [`outgoing`]: Outgoing-message and draft lifecycle
//! - [`ops`]: One function per MCP tool
//! - [`models`]: Input/output DTOs and schema-bearing types
//! - [`server`]: MCP tool handlers

mod bridge;
mod config;
mod envelope;
mod errors;
mod filter;
mod ids;
#[cfg(test)]
mod memory;
mod models;
mod ops;
mod osa;
mod outgoing;
mod query;
mod resolve;
mod server;

use std::sync::Arc;

use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bridge::MailApp;
use crate::config::{Options, ServerConfig, Transport};
use crate::osa::OsaBridge;
use crate::server::AppleMailServer;

/// Application entry point
///
/// Parses options, loads config, runs a non-fatal connectivity check against
/// Mail.app, and serves the MCP server over the selected transport. Logging
/// goes to stderr; in stdio mode stdout belongs to the MCP framing.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for the `APPLE_MAIL_*` options;
/// transport selection also honors `TRANSPORT`, `HOST`, `PORT`, and `DEBUG`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let options = Options::parse();

    let default_level = if options.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::load_from_env()?;
    let bridge = OsaBridge::new(&config);

    // Operations classify a dead bridge per call, so a failed check warns
    // and continues instead of aborting.
    match bridge.startup_check() {
        Ok(startup) => {
            info!(
                accounts = startup.account_count,
                version = %startup.version,
                "Mail.app is accessible and ready"
            );
        }
        Err(e) => {
            warn!(
                error = %e,
                "Mail.app connectivity check failed. This usually means either Mail.app \
                 is not running, or automation permission is missing (grant it in System \
                 Settings > Privacy & Security > Automation)."
            );
        }
    }

    let app: Arc<dyn MailApp> = Arc::new(bridge);
    let mcp_server = AppleMailServer::new(config, app);

    match options.transport {
        Transport::Stdio => {
            info!("Using stdio transport");
            let service = mcp_server.serve(stdio()).await?;
            service.waiting().await?;
        }
        Transport::Http => {
            let addr = format!("{}:{}", options.host, options.port);
            info!("Starting HTTP server on http://{addr}/mcp");

            let service = StreamableHttpService::new(
                move || Ok(mcp_server.clone()),
                LocalSessionManager::default().into(),
                Default::default(),
            );
            let router = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for shutdown signal");
                    }
                })
                .await?;
        }
    }

    Ok(())
}
