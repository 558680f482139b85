//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use std::io::{BufRead, Write};

use serde_json::Value;

use crate::error::Result;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server for the notes folder and calendar tools
pub struct McpServer {
    /// Reported server identity
    info: Implementation,

    /// Tool handler
    tool_handler: ToolHandler,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(name: impl Into<String>, version: impl Into<String>, tool_handler: ToolHandler) -> Self {
        Self {
            info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            tool_handler,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let writer = protocol_stdout()?;
        self.serve(stdin.lock(), writer).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` is exhausted
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        tracing::info!("{} {} serving on stdio", self.info.name, self.info.version);

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(&line).await {
                Ok(Some(response)) => {
                    let response_str = serde_json::to_string(&response)?;
                    writeln!(writer, "{}", response_str)?;
                    writer.flush()?;
                }
                Ok(None) => {
                    // Notification, no response needed
                }
                Err(e) => {
                    tracing::error!("Error handling message: {}", e);
                }
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    pub async fn handle_message(&mut self, message: &str) -> Result<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Ok(Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                )));
            }
        };

        let Some(id) = request.id.clone() else {
            if request.method == methods::INITIALIZED {
                self.initialized = true;
            } else {
                tracing::debug!("Ignoring notification {}", request.method);
            }
            return Ok(None);
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Ok(Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            )));
        }

        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = self.handle_initialize()?;
                Ok(Some(JsonRpcResponse::success(id, result)))
            }
            methods::PING => Ok(Some(JsonRpcResponse::success(id, serde_json::json!({})))),
            methods::LIST_TOOLS => {
                let result = self.handle_list_tools()?;
                Ok(Some(JsonRpcResponse::success(id, result)))
            }
            methods::CALL_TOOL => {
                let params: CallToolParams = match request.params {
                    Some(p) => match serde_json::from_value(p) {
                        Ok(params) => params,
                        Err(e) => {
                            return Ok(Some(JsonRpcResponse::error(
                                Some(id),
                                JsonRpcError::invalid_params(format!(
                                    "Invalid tool parameters: {}",
                                    e
                                )),
                            )));
                        }
                    },
                    None => {
                        return Ok(Some(JsonRpcResponse::error(
                            Some(id),
                            JsonRpcError::invalid_params("Missing tool parameters"),
                        )));
                    }
                };

                match self.handle_call_tool(params).await {
                    Ok(result) => Ok(Some(JsonRpcResponse::success(id, result))),
                    Err(e) => Ok(Some(JsonRpcResponse::error(
                        Some(id),
                        JsonRpcError::internal_error(e.to_string()),
                    ))),
                }
            }
            _ => Ok(Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::method_not_found(&request.method),
            ))),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: self.info.clone(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.tool_handler.list_tools(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, params: CallToolParams) -> Result<Value> {
        let result = self.tool_handler.call_tool(&params.name, params.arguments).await;
        if result.is_error {
            tracing::debug!("Tool {} returned an error", params.name);
        }
        Ok(serde_json::to_value(result)?)
    }
}

/// Take over stdout for protocol messages
///
/// The PDF extractor prints diagnostics with `println!`. The original stdout
/// descriptor is duplicated for responses and fd 1 is pointed at stderr, so
/// anything else printed to stdout lands in the log stream.
#[cfg(unix)]
fn protocol_stdout() -> Result<Box<dyn Write>> {
    use std::os::fd::AsFd;

    let stdout = std::io::stdout();
    stdout.lock().flush()?;
    let protocol = stdout.as_fd().try_clone_to_owned()?;

    // SAFETY: fds 1 and 2 stay open for the life of the process.
    if unsafe { libc::dup2(libc::STDERR_FILENO, libc::STDOUT_FILENO) } < 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(Box::new(std::io::BufWriter::new(std::fs::File::from(protocol))))
}

#[cfg(not(unix))]
fn protocol_stdout() -> Result<Box<dyn Write>> {
    Ok(Box::new(std::io::stdout()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::store::NoteStore;

    fn server() -> McpServer {
        let store = NoteStore::new("notes", vec![".txt".to_string()], 1024, encoding_rs::UTF_8);
        McpServer::new("Simple Note Reader", "1.0.0", ToolHandler::new(store, None))
    }

    #[tokio::test]
    async fn test_initialized_notification_gets_no_response() {
        let mut server = server();
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let response = server().handle_message("{not json").await.unwrap().unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_call_without_params() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":"a","method":"tools/call"}"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.id, Some(RequestId::String("a".to_string())));
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
