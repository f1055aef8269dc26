//! MCP request handler implementation.

use crate::error::ProtocolResult;
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, InitializeParams, InitializeResult, ListToolsResult,
    MCP_VERSION, ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::server::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{}",
            params.client_info.name, params.client_info.version
        );

        self.state.set_initialized(params.client_info);

        let instructions = format!(
            "SQLite query server for {}. \
            Use 'query_table' with a plain-text request to read data; it \
            synthesizes parameterized SQL, estimates cost, and samples or \
            refuses queries that exceed the row budget. Discovery tools: \
            list_tables, table_preview, column_stats, find_tables_by_column, \
            table_schema_info, database_overview, test_connection. All tools \
            accept an optional 'db_path' to target another database file.",
            self.state
                .store_manager
                .config()
                .database_path
                .display()
        );

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.state.config.name.to_string(),
                version: self.state.config.version.to_string(),
            },
            instructions: Some(instructions),
        })
    }

    async fn initialized(&self) -> ProtocolResult<()> {
        info!("Server initialized successfully");
        Ok(())
    }

    async fn shutdown(&self) -> ProtocolResult<()> {
        info!("Shutdown request received");
        Ok(())
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.tools.list();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        debug!("Tool call: {}", params.name);

        match self.state.tools.execute(params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Tool execution error: {}", e);
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueryConfig, ServerConfig};
    use crate::protocol::ClientInfo;
    use crate::server::state::ServerStateBuilder;

    fn handler() -> McpHandler {
        let config = ServerConfig::builder()
            .query(
                QueryConfig::builder()
                    .database_path(":memory:")
                    .build()
                    .unwrap(),
            )
            .build();
        McpHandler::new(Arc::new(ServerStateBuilder::new().config(config).build()))
    }

    fn init_params() -> InitializeParams {
        serde_json::from_value(serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_records_client() {
        let handler = handler();
        let result = handler.initialize(init_params()).await.unwrap();

        assert_eq!(result.protocol_version, MCP_VERSION);
        assert!(result.capabilities.tools.is_some());
        assert!(handler.state().is_initialized());
        assert_eq!(
            handler.state().client_info().map(|c| c.name),
            Some("test-client".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_tools_exposes_registry() {
        let handler = handler();
        let result = handler.list_tools().await.unwrap();
        assert_eq!(result.tools.len(), 8);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let handler = handler();
        let result = handler
            .call_tool(CallToolParams {
                name: "no_such_tool".into(),
                arguments: serde_json::json!({}),
            })
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
