//! MCP tool definitions and registry.

pub mod connection;
pub mod explore;
pub mod query;
pub mod registry;

pub use connection::TestConnectionTool;
pub use explore::{
    ColumnStatsTool, DatabaseOverviewTool, FindTablesByColumnTool, ListTablesTool,
    TablePreviewTool, TableSchemaInfoTool,
};
pub use query::QueryTableTool;
pub use registry::{ToolHandler, ToolRegistry};

use crate::database::StoreManager;
use std::sync::Arc;

/// Create and register all tools.
pub fn create_registry(store_manager: Arc<StoreManager>) -> ToolRegistry {
    let registry = ToolRegistry::new();

    registry.register(QueryTableTool::new(Arc::clone(&store_manager)));

    registry.register(ListTablesTool::new(Arc::clone(&store_manager)));
    registry.register(TablePreviewTool::new(Arc::clone(&store_manager)));
    registry.register(ColumnStatsTool::new(Arc::clone(&store_manager)));
    registry.register(FindTablesByColumnTool::new(Arc::clone(&store_manager)));
    registry.register(TableSchemaInfoTool::new(Arc::clone(&store_manager)));
    registry.register(DatabaseOverviewTool::new(Arc::clone(&store_manager)));

    registry.register(TestConnectionTool::new(store_manager));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;

    #[test]
    fn test_registry_has_all_tools() {
        let config = QueryConfig::builder()
            .database_path(":memory:")
            .build()
            .unwrap();
        let registry = create_registry(Arc::new(StoreManager::new(config)));

        let names: Vec<String> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "column_stats",
                "database_overview",
                "find_tables_by_column",
                "list_tables",
                "query_table",
                "table_preview",
                "table_schema_info",
                "test_connection",
            ]
        );
    }
}
