//! MCP server loop: stdio transport, method dispatch, lifecycle.
//!
//! Messages are newline-delimited JSON on stdin/stdout. Stdout carries
//! protocol frames only; all logging goes to stderr.

use crate::error::{McpError, ProtocolError, ProtocolResult, Result};
use crate::protocol::types::*;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace, warn};

/// Server-side view of the MCP lifecycle.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    async fn initialized(&self) -> ProtocolResult<()>;

    async fn shutdown(&self) -> ProtocolResult<()>;

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult>;

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult>;

    async fn ping(&self) -> ProtocolResult<Value> {
        Ok(serde_json::json!({}))
    }
}

/// Byte transport for JSON-RPC messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `Ok(None)` signals EOF.
    async fn read_message(&self) -> Result<Option<Message>>;
    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()>;
}

/// Newline-delimited JSON over stdin/stdout.
pub struct StdioTransport {
    reader: Mutex<BufReader<Stdin>>,
    writer: Mutex<Stdout>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin())),
            writer: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn read_message(&self) -> Result<Option<Message>> {
        let mut line = String::new();
        let bytes = self.reader.lock().await.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        trace!("Received line: {}", line);

        match serde_json::from_str::<Message>(line) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                error!("Failed to parse message: {}", e);
                Err(McpError::Protocol(ProtocolError::ParseError))
            }
        }
    }

    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        debug!("Sending response: id={:?}", response.id);

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Routes a parsed request to the handler and shapes the response.
pub struct Dispatcher<H: Handler> {
    handler: Arc<H>,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Dispatching request: {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "initialized" | "notifications/initialized" => {
                self.handler.initialized().await.map(|()| Value::Null)
            }
            "shutdown" => self.handler.shutdown().await.map(|()| Value::Null),
            "ping" => self.handler.ping().await,
            "tools/list" => to_value(self.handler.list_tools().await),
            "tools/call" => self.handle_call_tool(request.params).await,
            method => {
                warn!("Unknown method: {}", method);
                Err(ProtocolError::MethodNotFound(method.to_string()))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                error!("Request failed: {}", e);
                JsonRpcResponse::error(request.id, JsonRpcError::new(e.code(), e.to_string()))
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: InitializeParams = parse_params(params)?;
        to_value(self.handler.initialize(params).await)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: CallToolParams = parse_params(params)?;
        to_value(self.handler.call_tool(params).await)
    }
}

fn parse_params<P: serde::de::DeserializeOwned>(params: Option<Value>) -> ProtocolResult<P> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))?
        .ok_or_else(|| ProtocolError::InvalidParams("Missing params".into()))
}

fn to_value<R: serde::Serialize>(result: ProtocolResult<R>) -> ProtocolResult<Value> {
    let value = result?;
    serde_json::to_value(value).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}

/// The server loop: reads requests until EOF or shutdown.
pub struct McpServer<H: Handler> {
    info: ServerInfo,
    handler: Arc<H>,
    running: AtomicBool,
}

impl<H: Handler> McpServer<H> {
    pub fn new(handler: H, info: ServerInfo) -> Self {
        Self {
            info,
            handler: Arc::new(handler),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run over stdio until the client disconnects or asks to shut down.
    #[instrument(skip(self), fields(server = %self.info.name))]
    pub async fn run(self) -> Result<()> {
        self.run_with_transport(Arc::new(StdioTransport::new())).await
    }

    pub async fn run_with_transport<T: Transport + 'static>(self, transport: Arc<T>) -> Result<()> {
        info!(
            "Starting MCP server: {} v{}",
            self.info.name, self.info.version
        );
        self.running.store(true, Ordering::SeqCst);

        let dispatcher = Dispatcher::new(Arc::clone(&self.handler));

        while self.running.load(Ordering::SeqCst) {
            let message = match transport.read_message().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(McpError::Protocol(ProtocolError::ParseError)) => {
                    let response = JsonRpcResponse::error(None, JsonRpcError::parse_error());
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            match message {
                Message::Request(request) => {
                    let is_notification = request.is_notification();
                    let is_shutdown = request.method == "shutdown";

                    let response = dispatcher.dispatch(request).await;

                    if !is_notification && let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send response: {}", e);
                    }

                    if is_shutdown {
                        info!("Shutdown request received");
                        self.running.store(false, Ordering::SeqCst);
                    }
                }
                Message::Response(response) => {
                    // A server never issues requests, so no response is expected.
                    warn!("Unexpected response received: {:?}", response.id);
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Builder for [`McpServer`].
pub struct McpServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
}

impl<H: Handler> McpServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Result<McpServer<H>> {
        let handler = self.handler.ok_or(McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            ServerInfo {
                name: self.name,
                version: self.version,
            },
        ))
    }
}

impl<H: Handler> Default for McpServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockHandler;

    #[async_trait]
    impl Handler for MockHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult {
                protocol_version: MCP_VERSION.into(),
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn initialized(&self) -> ProtocolResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> ProtocolResult<()> {
            Ok(())
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult { tools: vec![] })
        }

        async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text(format!("called {}", params.name)))
        }
    }

    #[tokio::test]
    async fn test_dispatch_initialize() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler));
        let request = JsonRpcRequest::new("initialize")
            .with_id(1)
            .with_params(serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "client", "version": "1.0"}
            }));

        let response = dispatcher.dispatch(request).await;
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler));
        let request = JsonRpcRequest::new("resources/list").with_id(1);

        let response = dispatcher.dispatch(request).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_dispatch_call_tool_missing_params() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler));
        let request = JsonRpcRequest::new("tools/call").with_id(2);

        let response = dispatcher.dispatch(request).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_dispatch_call_tool() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler));
        let request = JsonRpcRequest::new("tools/call")
            .with_id(3)
            .with_params(serde_json::json!({"name": "list_tables", "arguments": {}}));

        let response = dispatcher.dispatch(request).await;
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "called list_tables");
    }

    #[test]
    fn test_server_builder_requires_handler() {
        let result = McpServerBuilder::<MockHandler>::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_server_builder() {
        let server = McpServerBuilder::new()
            .handler(MockHandler)
            .name("test-server")
            .version("0.1.0")
            .build()
            .unwrap();
        assert!(!server.is_running());
    }
}
