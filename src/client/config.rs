//! Client configuration
//!
//! Describes how to launch the server under test.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{ConfigError, NotesMcpError, Result};

/// Name of the server binary looked up next to the client
pub const SERVER_BINARY: &str = "notes-mcp-server";

/// Configuration for the MCP test client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Program to spawn
    pub command: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory for the server process
    pub cwd: Option<PathBuf>,

    /// Upper bound on every request/response exchange
    pub timeout: Duration,

    /// Token forwarded to the server process as PROXY_TOKEN
    pub proxy_token: Option<String>,
}

impl ClientConfig {
    /// Load from `.env` and the process environment
    pub fn new() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let command = var("SERVER_COMMAND").unwrap_or_else(default_server_command);

        let args = var("SERVER_ARGS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let timeout_secs = match var("CONNECTION_TIMEOUT") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                NotesMcpError::Config(ConfigError::InvalidValue {
                    var: "CONNECTION_TIMEOUT".to_string(),
                    message: format!("'{}': {}", raw, e),
                })
            })?,
            None => 30,
        };

        Ok(Self {
            command,
            args,
            cwd: var("SERVER_CWD").map(PathBuf::from),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            proxy_token: var("PROXY_TOKEN"),
        })
    }

    /// Summary of the client configuration, without secrets
    pub fn summary(&self) -> Value {
        json!({
            "server_command": self.command,
            "server_args": self.args,
            "server_cwd": self.cwd.as_ref().map(|p| p.display().to_string()),
            "connection_timeout": self.timeout.as_secs(),
            "proxy_token_set": self.proxy_token.is_some(),
        })
    }
}

/// The server binary installed alongside this executable, else whatever is on PATH
fn default_server_command() -> String {
    let binary = format!("{}{}", SERVER_BINARY, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&binary)))
        .filter(|path| path.exists())
        .map(|path| path.display().to_string())
        .unwrap_or(binary)
}
