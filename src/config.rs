//! Configuration for the Mail.app automation server
//!
//! Runtime settings are loaded from `APPLE_MAIL_*` environment variables;
//! transport selection comes from command-line options (with environment
//! fallbacks). The drafts-alias table for locale-named containers lives here
//! as well, so lookups share one configurable list instead of scattered
//! string literals.

use std::env;
use std::env::VarError;

use clap::{Parser, ValueEnum};

use crate::errors::{AppError, AppResult};

/// Built-in names for the local drafts container across common locales
///
/// Extended (never replaced) by `APPLE_MAIL_DRAFTS_ALIASES`.
const DEFAULT_DRAFTS_ALIASES: &[&str] = &["Drafts", "Entwürfe", "Brouillons", "Borradores", "Bozze"];

/// Command-line options
///
/// Every option can also be supplied through the environment, which keeps MCP
/// client configurations that cannot pass flags working.
#[derive(Debug, Clone, Parser)]
#[command(name = "apple-mail-mcp-rs", version, about)]
pub struct Options {
    /// Transport to serve MCP over
    #[arg(long, env = "TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// HTTP host (only used with --transport=http)
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// HTTP port (only used with --transport=http)
    #[arg(long, env = "PORT", default_value_t = 8787)]
    pub port: u16,

    /// Enable debug logging of tool calls and bridge round-trips to stderr
    #[arg(long, env = "DEBUG", default_value_t = false)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

/// Server-wide configuration
///
/// Cloned into tool handlers via `Arc` for shared access.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for one scripting round-trip in milliseconds
    ///
    /// The local subprocess is killed on expiry; application-side work that
    /// has already been issued cannot be aborted.
    pub script_timeout_ms: u64,
    /// Deadline for the launch-time liveness check in milliseconds
    pub startup_timeout_ms: u64,
    /// Whether mutation tools (create/replace/delete) are enabled
    pub write_enabled: bool,
    /// Names recognized as a local drafts container, defaults plus extensions
    pub drafts_aliases: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from `APPLE_MAIL_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a variable is set to a malformed value.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// APPLE_MAIL_SCRIPT_TIMEOUT_MS=60000
    /// APPLE_MAIL_WRITE_ENABLED=false
    /// APPLE_MAIL_DRAFTS_ALIASES=Koncepty,Utkast
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let mut drafts_aliases: Vec<String> = DEFAULT_DRAFTS_ALIASES
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        for alias in parse_list_env("APPLE_MAIL_DRAFTS_ALIASES")? {
            if !drafts_aliases.contains(&alias) {
                drafts_aliases.push(alias);
            }
        }

        Ok(Self {
            script_timeout_ms: parse_u64_env("APPLE_MAIL_SCRIPT_TIMEOUT_MS", 60_000)?,
            startup_timeout_ms: parse_u64_env("APPLE_MAIL_STARTUP_TIMEOUT_MS", 10_000)?,
            write_enabled: parse_bool_env("APPLE_MAIL_WRITE_ENABLED", true)?,
            drafts_aliases,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: 60_000,
            startup_timeout_ms: 10_000,
            write_enabled: true,
            drafts_aliases: DEFAULT_DRAFTS_ALIASES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

/// Parse a boolean environment variable with flexible values
///
/// Accepts: `1`, `true`, `yes`, `y`, `on` (truthy) or `0`, `false`, `no`,
/// `n`, `off` (falsy). Case-insensitive. Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidArgument` if the variable is set to an unrecognized value.
fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match env::var(key) {
        Ok(v) => parse_bool_value(&v).ok_or_else(|| {
            AppError::invalid(format!("invalid boolean environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::invalid(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u64` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidArgument` if the variable is set but not a valid `u64`.
fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| {
            AppError::invalid(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::invalid(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a comma-separated list environment variable
///
/// Entries are trimmed; empty entries are dropped. Returns an empty list if
/// unset.
fn parse_list_env(key: &str) -> AppResult<Vec<String>> {
    match env::var(key) {
        Ok(v) => Ok(v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()),
        Err(VarError::NotPresent) => Ok(Vec::new()),
        Err(VarError::NotUnicode(_)) => Err(AppError::invalid(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}
