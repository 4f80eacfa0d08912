// MCP server: newline-delimited JSON-RPC 2.0 over stdio

use crate::protocol::{
    negotiate_protocol_version, CallToolParams, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities,
    ServerInfo, ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite, LinesCodec,
};

pub const SERVER_NAME: &str = "bedrock-server";

/// Longest accepted message line; longer lines are discarded up to the next newline
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
    max_message_bytes: usize,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_info(registry, SERVER_NAME, env!("CARGO_PKG_VERSION"))
    }

    pub fn with_info(
        registry: ToolRegistry,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Serve on the process's stdin/stdout until the client disconnects
    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            server = %self.info.name,
            version = %self.info.version,
            tools = self.registry.len(),
            "MCP server listening on stdio"
        );
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC messages, one at a time, until EOF
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut incoming = FramedRead::new(
            reader,
            AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                Vec::new(),
                self.max_message_bytes,
            ),
        );
        let mut outgoing = FramedWrite::new(writer, LinesCodec::new());
        let mut recovering = false;

        loop {
            let frame = match incoming.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                    tracing::warn!(
                        limit = self.max_message_bytes,
                        "Discarding oversized message"
                    );
                    let response = JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error());
                    send(&mut outgoing, &response).await?;
                    recovering = true;
                    continue;
                }
                Some(Err(AnyDelimiterCodecError::Io(e))) => {
                    return Err(e).context("Failed to read from MCP transport");
                }
                // The framed reader yields one `None` after a decode error, then resumes
                None if recovering => {
                    recovering = false;
                    continue;
                }
                None => break,
            };

            let line = String::from_utf8_lossy(&frame);
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                send(&mut outgoing, &response).await?;
            }
        }

        tracing::info!("MCP transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` when no reply is due
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Received unparseable message");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()));
            }
        };

        // Replies to server-initiated requests; this server never sends any
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            tracing::debug!("Ignoring JSON-RPC response from client");
            return None;
        }

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Received invalid JSON-RPC request");
                return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, request.params).await,
            method => {
                tracing::warn!(method = %method, "Unsupported method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        };
        Some(response)
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing initialize params"),
                )
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)),
                )
            }
        };

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        let client = params
            .client_info
            .as_ref()
            .map(|c| format!("{} {}", c.name, c.version))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!(
            client = %client,
            requested = %params.protocol_version,
            protocol_version = protocol_version,
            "Client connected"
        );

        JsonRpcResponse::success(
            id,
            InitializeResult {
                protocol_version: protocol_version.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: self.info.clone(),
            },
        )
    }

    fn list_tools(&self, id: Value) -> JsonRpcResponse {
        let tools = self.registry.list_schemas();
        tracing::info!(count = tools.len(), "Listing tools");
        JsonRpcResponse::success(id, ListToolsResult { tools })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tools/call params"),
                )
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)),
                )
            }
        };

        let Some(tool) = self.registry.get(&params.name) else {
            tracing::warn!(tool = %params.name, "Unknown tool requested");
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)),
            );
        };

        tracing::info!(tool = %params.name, "Calling tool");
        let started = Instant::now();
        match tool.execute(params.arguments).await {
            Ok(result) => {
                tracing::info!(
                    tool = %params.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    is_error = result.is_error.unwrap_or(false),
                    "Tool call finished"
                );
                JsonRpcResponse::success(id, result)
            }
            Err(e) => {
                tracing::error!(tool = %params.name, error = %format!("{:#}", e), "Tool call failed");
                JsonRpcResponse::error(id, JsonRpcError::internal_error(format!("{:#}", e)))
            }
        }
    }
}

async fn send<W>(outgoing: &mut FramedWrite<W, LinesCodec>, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = serde_json::to_string(response).context("Failed to encode response")?;
    outgoing
        .send(encoded)
        .await
        .context("Failed to write to MCP transport")
}
