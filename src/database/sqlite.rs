//! SQLite storage backend.
//!
//! One serialized connection per store: SQLite's own concurrency model
//! expects per-connection serialization, so the connection lives behind a
//! mutex and blocking work runs on the tokio blocking pool, bounded by
//! the configured query timeout.

use crate::database::{
    CellValue, ColumnType, QueryParams, Row, StorageBackend, TableSchema, sanitize_identifier,
};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, ToSql};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

fn exec_err(e: rusqlite::Error) -> DatabaseError {
    DatabaseError::ExecutionFailed(e.to_string())
}

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    query_timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    ///
    /// `:memory:` is accepted and yields a private in-memory database.
    pub fn open(path: impl AsRef<Path>, query_timeout: Duration) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| DatabaseError::OpenFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!("Opened SQLite database at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            query_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on the blocking pool, bounded
    /// by the query timeout.
    async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        });

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                error!("Blocking task failed: {}", join_err);
                Err(DatabaseError::ExecutionFailed(join_err.to_string()))
            }
            Err(_) => Err(DatabaseError::Timeout(self.query_timeout.as_millis() as u64)),
        }
    }

    /// Synchronous batch execution, for seeding test databases.
    #[cfg(test)]
    pub(crate) fn exec_batch(&self, sql: &str) {
        self.conn.lock().execute_batch(sql).expect("test setup SQL failed");
    }
}

#[async_trait]
impl StorageBackend for SqliteStore {
    async fn table_exists(&self, table: &str) -> DbResult<bool> {
        let name = table.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&name],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(exec_err)
        })
        .await
    }

    async fn table_schema(&self, table: &str) -> DbResult<TableSchema> {
        let table = sanitize_identifier(table);
        self.run(move |conn| {
            // PRAGMA arguments cannot be bound, hence the sanitized interpolation.
            let sql = format!("PRAGMA table_info({})", table);
            let mut stmt = conn.prepare(&sql).map_err(exec_err)?;
            let mut rows = stmt.query([]).map_err(exec_err)?;

            let mut schema = TableSchema::new();
            while let Some(row) = rows.next().map_err(exec_err)? {
                let name: String = row.get(1).map_err(exec_err)?;
                let declared: Option<String> = row.get(2).map_err(exec_err)?;
                schema.push(name, ColumnType::from_declared(declared.as_deref().unwrap_or("")));
            }

            if schema.is_empty() {
                return Err(DatabaseError::TableNotFound(table));
            }
            Ok(schema)
        })
        .await
    }

    async fn row_count(&self, table: &str) -> DbResult<u64> {
        let table = sanitize_identifier(table);
        self.run(move |conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0)).map_err(exec_err)?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn execute_query(&self, sql: &str, params: &QueryParams) -> DbResult<Vec<Row>> {
        let sql = sql.to_string();
        let params = params.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(exec_err)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            // rusqlite wants the leading ':' on parameter names.
            let keyed: Vec<(String, crate::database::ParamValue)> = params
                .into_iter()
                .map(|(name, value)| (format!(":{}", name), value))
                .collect();
            let bound: Vec<(&str, &dyn ToSql)> = keyed
                .iter()
                .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                .collect();

            let mut rows = stmt.query(&bound[..]).map_err(exec_err)?;
            let mut results = Vec::new();
            while let Some(row) = rows.next().map_err(exec_err)? {
                let mut record = Row::with_capacity(columns.len());
                for (i, name) in columns.iter().enumerate() {
                    let value = row.get_ref(i).map_err(exec_err)?;
                    record.insert(name.clone(), CellValue::from(value));
                }
                results.push(record);
            }
            Ok(results)
        })
        .await
    }

    async fn list_tables(&self) -> DbResult<Vec<String>> {
        self.run(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                     ORDER BY name",
                )
                .map_err(exec_err)?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(exec_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(exec_err)?;
            Ok(names)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ParamValue;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open(":memory:", Duration::from_secs(5)).unwrap();
        store.exec_batch(
            "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT, price REAL, created_at DATETIME);
             INSERT INTO widgets (name, price, created_at) VALUES
                ('bolt', 0.5, '2024-01-01'),
                ('nut', 0.2, '2024-02-01'),
                ('gear', 4.5, '2024-03-01');",
        );
        store
    }

    #[tokio::test]
    async fn test_table_exists() {
        let store = test_store();
        assert!(store.table_exists("widgets").await.unwrap());
        assert!(!store.table_exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_table_schema_ordered_and_typed() {
        let store = test_store();
        let schema = store.table_schema("widgets").await.unwrap();

        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "name", "price", "created_at"]);
        assert_eq!(schema.get("id"), Some(ColumnType::Integer));
        assert_eq!(schema.get("price"), Some(ColumnType::Real));
        assert_eq!(schema.get("created_at"), Some(ColumnType::DateTime));
    }

    #[tokio::test]
    async fn test_table_schema_missing_table() {
        let store = test_store();
        let err = store.table_schema("ghost").await.unwrap_err();
        assert!(matches!(err, DatabaseError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_row_count() {
        let store = test_store();
        assert_eq!(store.row_count("widgets").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_execute_query_with_named_params() {
        let store = test_store();
        let mut params = QueryParams::new();
        params.insert("param1".into(), ParamValue::Text("gear".into()));

        let rows = store
            .execute_query("SELECT id, name FROM widgets WHERE name = :param1", &params)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], CellValue::Text("gear".into()));
    }

    #[tokio::test]
    async fn test_execute_query_bad_sql() {
        let store = test_store();
        let err = store
            .execute_query("SELECT nope FROM widgets", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn test_list_tables_excludes_internals() {
        let store = test_store();
        store.exec_batch("CREATE TABLE aardvark (id INTEGER)");
        let tables = store.list_tables().await.unwrap();
        assert_eq!(tables, vec!["aardvark".to_string(), "widgets".to_string()]);
    }
}
