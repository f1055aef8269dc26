//! Connectivity check tool.

use crate::database::{StorageBackend, StoreManager};
use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::{ToolHandler, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct TestConnectionArgs {
    #[serde(default)]
    db_path: Option<String>,
}

pub struct TestConnectionTool {
    store_manager: Arc<StoreManager>,
}

impl TestConnectionTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for TestConnectionTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "test_connection".into(),
            description: Some(
                "Verify the database can be opened and queried, reporting its \
                path and table count."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "db_path": {
                        "type": "string",
                        "description": "Path to a SQLite database file, overriding the configured default."
                    }
                }
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "test_connection"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: TestConnectionArgs = parse_args(arguments)?;

        let store = match self.store_manager.store_for(args.db_path.as_deref()) {
            Ok(store) => store,
            Err(e) => return Ok(CallToolResult::error(format!("Connection failed: {}", e))),
        };

        match store.list_tables().await {
            Ok(tables) => Ok(CallToolResult::text(format!(
                "Connection OK. Database: {} ({} tables)",
                store.path().display(),
                tables.len()
            ))),
            Err(e) => Err(McpError::from(e)),
        }
    }
}
