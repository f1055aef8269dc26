//! Schema discovery and profiling tools.

use crate::database::StoreManager;
use crate::error::{McpError, Result};
use crate::explore::ExplorationService;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::{ToolHandler, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

fn db_path_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Path to a SQLite database file, overriding the configured default."
    })
}

fn service_for(store_manager: &StoreManager, db_path: Option<&str>) -> Result<ExplorationService> {
    let store = store_manager.store_for(db_path).map_err(McpError::from)?;
    Ok(ExplorationService::new(store))
}

#[derive(Debug, Deserialize)]
struct DbPathArgs {
    #[serde(default)]
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableArgs {
    table: String,
    #[serde(default)]
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablePreviewArgs {
    table: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ColumnStatsArgs {
    table: String,
    column: String,
    #[serde(default)]
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindColumnArgs {
    column: String,
    #[serde(default)]
    db_path: Option<String>,
}

pub struct ListTablesTool {
    store_manager: Arc<StoreManager>,
}

impl ListTablesTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_tables".into(),
            description: Some("List all user tables in the database.".into()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "db_path": db_path_property()
                }
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "list_tables"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DbPathArgs = parse_args(arguments)?;
        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(service.list_tables().await?))
    }
}

pub struct TablePreviewTool {
    store_manager: Arc<StoreManager>,
}

impl TablePreviewTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for TablePreviewTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "table_preview".into(),
            description: Some(
                "Show the first rows of a table, up to ten columns wide, \
                ordered by the first column."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {"type": "string", "description": "Table to preview."},
                    "limit": {
                        "type": "integer",
                        "description": "Rows to show (default and maximum come from configuration).",
                        "minimum": 1
                    },
                    "db_path": db_path_property()
                },
                "required": ["table"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "table_preview"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: TablePreviewArgs = parse_args(arguments)?;
        let max_rows = self.store_manager.config().max_preview_rows;
        let limit = args.limit.unwrap_or(max_rows).min(max_rows);

        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(
            service.table_preview(&args.table, limit).await?,
        ))
    }
}

pub struct ColumnStatsTool {
    store_manager: Arc<StoreManager>,
}

impl ColumnStatsTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for ColumnStatsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "column_stats".into(),
            description: Some(
                "Profile one column: min/max/avg/sum for numeric columns, \
                distinct-value count otherwise, plus null counts."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {"type": "string", "description": "Table containing the column."},
                    "column": {"type": "string", "description": "Column to profile."},
                    "db_path": db_path_property()
                },
                "required": ["table", "column"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "column_stats"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ColumnStatsArgs = parse_args(arguments)?;
        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(
            service.column_statistics(&args.table, &args.column).await?,
        ))
    }
}

pub struct FindTablesByColumnTool {
    store_manager: Arc<StoreManager>,
}

impl FindTablesByColumnTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for FindTablesByColumnTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "find_tables_by_column".into(),
            description: Some(
                "Find every table that contains a column with the given name.".into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "column": {"type": "string", "description": "Column name to search for."},
                    "db_path": db_path_property()
                },
                "required": ["column"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "find_tables_by_column"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: FindColumnArgs = parse_args(arguments)?;
        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(
            service.find_tables_by_column(&args.column).await?,
        ))
    }
}

pub struct TableSchemaInfoTool {
    store_manager: Arc<StoreManager>,
}

impl TableSchemaInfoTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for TableSchemaInfoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "table_schema_info".into(),
            description: Some("Show a table's columns, their types, and its row count.".into()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {"type": "string", "description": "Table to describe."},
                    "db_path": db_path_property()
                },
                "required": ["table"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "table_schema_info"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: TableArgs = parse_args(arguments)?;
        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(
            service.table_schema_info(&args.table).await?,
        ))
    }
}

pub struct DatabaseOverviewTool {
    store_manager: Arc<StoreManager>,
}

impl DatabaseOverviewTool {
    pub fn new(store_manager: Arc<StoreManager>) -> Self {
        Self { store_manager }
    }
}

#[async_trait]
impl ToolHandler for DatabaseOverviewTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "database_overview".into(),
            description: Some(
                "Summarize the whole database: every table with its row and \
                column counts."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "db_path": db_path_property()
                }
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "database_overview"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DbPathArgs = parse_args(arguments)?;
        let service = service_for(&self.store_manager, args.db_path.as_deref())?;
        Ok(CallToolResult::text(service.database_overview().await?))
    }
}
