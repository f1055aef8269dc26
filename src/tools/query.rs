//! The query-synthesis tool: free text in, rendered envelope out.

use crate::database::StoreManager;
use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::query::{QueryPipeline, QueryRequest};
use crate::tools::registry::{ToolHandler, parse_args};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub struct QueryTableTool {
    store_manager: Arc<StoreManager>,
}

impl QueryTableTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for QueryTableTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "query_table".into(),
            description: Some(
                "Query a SQLite table from a plain-text description. \
                Understands column lists ('select id, name from orders'), \
                equality and IN filters ('status = open', 'region in (a, b)'), \
                LIKE patterns, date ranges ('last 30 days', 'this month', \
                'between \"2024-01-01\" and \"2024-02-01\"'), order by, group by \
                and row limits. Large result sets are estimated first and \
                automatically downgraded to a random sample when they exceed \
                the row budget."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "user_text": {
                        "type": "string",
                        "description": "Plain-text description of the query, e.g. 'orders from last 30 days where status = shipped limit 20'"
                    },
                    "table": {
                        "type": "string",
                        "description": "Table to query. Optional when the text contains 'from <table>'."
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum rows to return. Overrides any limit in the text.",
                        "minimum": 1
                    },
                    "rows_budget": {
                        "type": "integer",
                        "description": "Override of the estimated-row budget for this request.",
                        "minimum": 1
                    },
                    "db_path": {
                        "type": "string",
                        "description": "Path to a SQLite database file, overriding the configured default."
                    }
                },
                "required": ["user_text"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "query_table"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let request: QueryRequest = parse_args(arguments)?;

        let store = self
            .store_manager
            .store_for(request.db_path.as_deref())
            .map_err(McpError::from)?;

        let pipeline = QueryPipeline::new(store, self.store_manager.config().clone());
        let envelope = pipeline.process(&request).await;

        Ok(CallToolResult::text(envelope.render()))
    }
}
