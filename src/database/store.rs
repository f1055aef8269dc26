//! Store ownership: the process-default store plus per-request overrides.

use crate::config::QueryConfig;
use crate::database::SqliteStore;
use crate::error::DbResult;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Owns SQLite stores on behalf of the tool layer.
///
/// The default store is opened lazily from the configured path and shared
/// for the life of the process. A per-request `db_path` override gets its
/// own short-lived store, dropped (and its connection closed) when the
/// last `Arc` goes away.
pub struct StoreManager {
    config: QueryConfig,
    default_store: RwLock<Option<Arc<SqliteStore>>>,
}

impl StoreManager {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            config,
            default_store: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// The shared store at the configured database path.
    pub fn default_store(&self) -> DbResult<Arc<SqliteStore>> {
        if let Some(store) = self.default_store.read().as_ref() {
            return Ok(Arc::clone(store));
        }

        let mut guard = self.default_store.write();
        // Another caller may have won the race while we waited.
        if let Some(store) = guard.as_ref() {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(SqliteStore::open(
            &self.config.database_path,
            self.config.query_timeout,
        )?);
        info!("Opened default database at {}", store.path().display());
        *guard = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Resolve the store for a request, honoring a path override.
    pub fn store_for(&self, db_path: Option<&str>) -> DbResult<Arc<SqliteStore>> {
        match db_path {
            Some(path) => {
                let store = SqliteStore::open(path, self.config.query_timeout)?;
                Ok(Arc::new(store))
            }
            None => self.default_store(),
        }
    }
}
