//! MCP client session over a child process' stdio

use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::client::config::ClientConfig;
use crate::error::{McpError, NotesMcpError, Result};
use crate::mcp::types::*;

const CLIENT_NAME: &str = "notes-mcp-client";

/// A connected MCP client
pub struct McpClient {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: i64,
    timeout: Duration,
    server_info: Option<Implementation>,
}

impl McpClient {
    /// Spawn the server and complete the initialize handshake
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }
        if let Some(token) = &config.proxy_token {
            command.env("PROXY_TOKEN", token);
        }

        tracing::debug!("Spawning {} {:?}", config.command, config.args);
        let mut child = command.spawn().map_err(|e| transport(format!(
            "failed to start '{}': {}",
            config.command, e
        )))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| transport("server stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| transport("server stdout unavailable"))?;

        let mut client = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            timeout: config.timeout,
            server_info: None,
        };
        client.initialize().await?;
        Ok(client)
    }

    /// Server identity from the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn initialize(&mut self) -> Result<()> {
        let params = InitializeParams {
            protocol_version: MCP_VERSION.to_string(),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: serde_json::json!({}),
        };

        let result = self
            .request(methods::INITIALIZE, Some(serde_json::to_value(params)?))
            .await?;
        let result: InitializeResult = serde_json::from_value(result)?;
        tracing::debug!("Connected to {} {}", result.server_info.name, result.server_info.version);
        self.server_info = Some(result.server_info);

        self.send(&JsonRpcRequest::notification(methods::INITIALIZED, None))
            .await
    }

    /// Fetch the server's tool list
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        let result = self.request(methods::LIST_TOOLS, None).await?;
        let result: ListToolsResult = serde_json::from_value(result)?;
        Ok(result.tools)
    }

    /// Invoke a tool
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self
            .request(methods::CALL_TOOL, Some(serde_json::to_value(params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the server's stdin and wait for it to exit
    pub async fn disconnect(mut self) -> Result<()> {
        drop(self.stdin);
        match tokio::time::timeout(self.timeout, self.child.wait()).await {
            Ok(status) => {
                tracing::debug!("Server exited with {}", status?);
            }
            Err(_) => {
                tracing::warn!("Server did not exit, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        self.send(&JsonRpcRequest::new(id.clone(), method, params))
            .await?;

        let response = match tokio::time::timeout(self.timeout, self.read_response(&id)).await {
            Ok(response) => response?,
            Err(_) => {
                return Err(NotesMcpError::Mcp(McpError::Timeout {
                    method: method.to_string(),
                    secs: self.timeout.as_secs(),
                }))
            }
        };

        if let Some(error) = response.error {
            return Err(NotesMcpError::Mcp(McpError::ServerError {
                code: error.code,
                message: error.message,
            }));
        }
        response.result.ok_or_else(|| {
            NotesMcpError::Mcp(McpError::ProtocolError {
                message: format!("response to {} has neither result nor error", method),
            })
        })
    }

    async fn send(&mut self, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the response for `id` arrives
    async fn read_response(&mut self, id: &RequestId) -> Result<JsonRpcResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| transport("server closed its output"))?;
            if line.trim().is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Ignoring non-JSON server output: {}", e);
                    continue;
                }
            };
            // Server-initiated requests and notifications carry a method.
            if value.get("method").is_some() {
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_value(value)?;
            if response.id.as_ref() == Some(id) || response.id.is_none() {
                return Ok(response);
            }
            tracing::debug!("Ignoring response for {:?}", response.id);
        }
    }
}

fn transport(message: impl Into<String>) -> NotesMcpError {
    NotesMcpError::Mcp(McpError::TransportError {
        message: message.into(),
    })
}
