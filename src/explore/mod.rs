//! Schema exploration and data profiling over a storage backend.
//!
//! Read-only helpers behind the discovery tools. Everything renders to
//! display text; structured access goes through the query pipeline
//! instead.

use crate::database::{CellValue, ParamValue, QueryParams, StorageBackend, sanitize_identifier};
use crate::error::Result;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

/// Column cap for table previews.
const MAX_PREVIEW_COLUMNS: usize = 10;

pub struct ExplorationService {
    store: Arc<dyn StorageBackend>,
}

impl ExplorationService {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        Self { store }
    }

    /// All user tables, one per line.
    pub async fn list_tables(&self) -> Result<String> {
        let tables = self.store.list_tables().await?;
        if tables.is_empty() {
            return Ok("No tables found in the database.".to_string());
        }

        let mut out = format!("Tables ({}):\n", tables.len());
        for table in &tables {
            let _ = writeln!(out, "  {}", table);
        }
        Ok(out)
    }

    /// First rows of a table: up to ten columns, ordered by the first
    /// column so repeated previews are stable.
    pub async fn table_preview(&self, table: &str, limit: u32) -> Result<String> {
        let table = sanitize_identifier(table);
        let schema = self.store.table_schema(&table).await?;

        let columns: Vec<&str> = schema.column_names().take(MAX_PREVIEW_COLUMNS).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY 1 LIMIT :limit",
            columns.join(", "),
            table
        );
        let mut params = QueryParams::new();
        params.insert("limit".into(), ParamValue::Int(i64::from(limit)));

        let rows = self.store.execute_query(&sql, &params).await?;

        let mut out = format!("Preview of '{}' ({} rows", table, rows.len());
        if schema.len() > MAX_PREVIEW_COLUMNS {
            let _ = write!(
                out,
                ", first {} of {} columns",
                MAX_PREVIEW_COLUMNS,
                schema.len()
            );
        }
        out.push_str("):\n");

        for row in &rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|col| {
                    row.get(*col)
                        .map(CellValue::to_string)
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            let _ = writeln!(out, "  {}", cells.join(" | "));
        }
        Ok(out)
    }

    /// Profile one column: numeric columns get range and aggregate
    /// statistics, everything else gets cardinality.
    pub async fn column_statistics(&self, table: &str, column: &str) -> Result<String> {
        let table = sanitize_identifier(table);
        let column = sanitize_identifier(column);
        let schema = self.store.table_schema(&table).await?;

        let Some(column_type) = schema.get(&column) else {
            return Ok(format!(
                "Column '{}' does not exist in table '{}'.",
                column, table
            ));
        };

        let sql = if column_type.is_numeric() {
            format!(
                "SELECT COUNT(*) AS total_rows, COUNT({col}) AS non_null, \
                 MIN({col}) AS min_value, MAX({col}) AS max_value, \
                 AVG({col}) AS avg_value, SUM({col}) AS sum_value FROM {table}",
                col = column,
                table = table
            )
        } else {
            format!(
                "SELECT COUNT(*) AS total_rows, COUNT({col}) AS non_null, \
                 COUNT(DISTINCT {col}) AS distinct_count FROM {table}",
                col = column,
                table = table
            )
        };

        let rows = self.store.execute_query(&sql, &QueryParams::new()).await?;
        let Some(row) = rows.first() else {
            return Ok(format!("No statistics available for '{}.{}'.", table, column));
        };

        let total = cell_i64(row.get("total_rows"));
        let non_null = cell_i64(row.get("non_null"));

        let mut out = format!("Statistics for '{}.{}' ({}):\n", table, column, column_type);
        let _ = writeln!(out, "  total rows: {}", total);
        let _ = writeln!(out, "  non-null: {}", non_null);
        let _ = writeln!(out, "  null: {}", total - non_null);

        if column_type.is_numeric() {
            for (label, key) in [
                ("min", "min_value"),
                ("max", "max_value"),
                ("avg", "avg_value"),
                ("sum", "sum_value"),
            ] {
                let value = row
                    .get(key)
                    .map(CellValue::to_string)
                    .unwrap_or_else(|| "NULL".to_string());
                let _ = writeln!(out, "  {}: {}", label, value);
            }
        } else {
            let _ = writeln!(out, "  distinct values: {}", cell_i64(row.get("distinct_count")));
        }
        Ok(out)
    }

    /// All tables containing a column with the given name.
    pub async fn find_tables_by_column(&self, column: &str) -> Result<String> {
        let tables = self.store.list_tables().await?;
        let mut matches = Vec::new();

        for table in &tables {
            match self.store.table_schema(table).await {
                Ok(schema) => {
                    if let Some(column_type) = schema.get(column) {
                        matches.push((table.clone(), column_type));
                    }
                }
                Err(e) => warn!("Skipping table '{}' during column search: {}", table, e),
            }
        }

        if matches.is_empty() {
            return Ok(format!("No tables contain a column named '{}'.", column));
        }

        let mut out = format!("Tables with column '{}' ({}):\n", column, matches.len());
        for (table, column_type) in matches {
            let _ = writeln!(out, "  {} ({})", table, column_type);
        }
        Ok(out)
    }

    /// Full schema listing for one table, plus its row count.
    pub async fn table_schema_info(&self, table: &str) -> Result<String> {
        let table = sanitize_identifier(table);
        let schema = self.store.table_schema(&table).await?;
        let row_count = self.store.row_count(&table).await?;

        let mut out = format!(
            "Table '{}': {} columns, {} rows\n",
            table,
            schema.len(),
            row_count
        );
        for (name, column_type) in schema.iter() {
            let _ = writeln!(out, "  {} {}", name, column_type);
        }
        Ok(out)
    }

    /// One-line summary per table. A table whose metadata cannot be read
    /// is reported as unavailable rather than failing the overview.
    pub async fn database_overview(&self) -> Result<String> {
        let tables = self.store.list_tables().await?;
        if tables.is_empty() {
            return Ok("Database is empty: no user tables.".to_string());
        }

        let mut out = format!("Database overview ({} tables):\n", tables.len());
        for table in &tables {
            let schema = self.store.table_schema(table).await;
            let rows = self.store.row_count(table).await;
            match (schema, rows) {
                (Ok(schema), Ok(rows)) => {
                    let _ = writeln!(out, "  {}: {} rows, {} columns", table, rows, schema.len());
                }
                (schema, rows) => {
                    if let Err(e) = schema.map(|_| ()).and(rows.map(|_| ())) {
                        warn!("Overview degraded for table '{}': {}", table, e);
                    }
                    let _ = writeln!(out, "  {}: (info unavailable)", table);
                }
            }
        }
        Ok(out)
    }
}

fn cell_i64(value: Option<&CellValue>) -> i64 {
    value.and_then(CellValue::as_i64).unwrap_or(0)
}
