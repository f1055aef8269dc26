//! Storage layer: the SQLite collaborator behind the query pipeline.
//!
//! All real I/O happens here. The pipeline only sees the
//! [`StorageBackend`] trait, so tests can point it at throwaway
//! in-memory databases.

pub mod schema;
pub mod sqlite;
pub mod store;

pub use schema::{CellValue, ColumnType, ParamValue, QueryParams, Row, TableSchema};
pub use sqlite::SqliteStore;
pub use store::StoreManager;

use crate::error::DbResult;
use async_trait::async_trait;

/// Async storage collaborator contract.
///
/// Implemented by [`SqliteStore`]. Every call is bounded by the
/// configured query timeout.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Checks whether a table exists.
    async fn table_exists(&self, table: &str) -> DbResult<bool>;

    /// Loads the live schema for a table.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::TableNotFound`](crate::error::DatabaseError::TableNotFound)
    /// if the table does not exist.
    async fn table_schema(&self, table: &str) -> DbResult<TableSchema>;

    /// Counts the rows in a table.
    async fn row_count(&self, table: &str) -> DbResult<u64>;

    /// Executes a read query with named parameters.
    async fn execute_query(&self, sql: &str, params: &QueryParams) -> DbResult<Vec<Row>>;

    /// Lists user tables, ordered by name, excluding `sqlite_%` internals.
    async fn list_tables(&self) -> DbResult<Vec<String>>;
}

/// Reduce a possibly schema-qualified table reference to a bare,
/// lower-cased table name.
pub fn normalize_table_ref(table_ref: &str) -> String {
    match table_ref.rsplit_once('.') {
        Some((_, name)) => name.trim().to_lowercase(),
        None => table_ref.trim().to_lowercase(),
    }
}

/// Strip anything that is not `[A-Za-z0-9_]` from an identifier that will
/// be interpolated into SQL text (table names, PRAGMA arguments).
pub fn sanitize_identifier(identifier: &str) -> String {
    let mut sanitized: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_table_ref() {
        assert_eq!(normalize_table_ref("Orders"), "orders");
        assert_eq!(normalize_table_ref("  widgets "), "widgets");
        assert_eq!(normalize_table_ref("main.Orders"), "orders");
        assert_eq!(normalize_table_ref("db.schema.users"), "users");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("orders"), "orders");
        assert_eq!(sanitize_identifier("orders; DROP TABLE x"), "ordersdroptablex");
        assert_eq!(sanitize_identifier("o'brien"), "obrien");
        assert_eq!(sanitize_identifier("2024_sales"), "_2024_sales");
    }
}
