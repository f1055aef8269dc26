//! MCP server that answers plain-text questions about a SQLite database.
//!
//! The query tool turns free text into a parameterized SELECT: a rule
//! extractor pulls filters out of the text, a schema-aware synthesizer
//! builds the statement, a heuristic estimator prices it, and queries
//! over the row budget are downgraded to random sampling or refused.
//! Discovery tools cover schemas, previews, and column statistics.
//!
//! # Example
//!
//! ```no_run
//! use sqlite_query_mcp::{
//!     config::{QueryConfig, ServerConfig},
//!     protocol::McpServerBuilder,
//!     server::{McpHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let query = QueryConfig::builder()
//!         .database_path("inventory.db")
//!         .build()?;
//!     let config = ServerConfig::builder().query(query).build();
//!
//!     let state = Arc::new(ServerStateBuilder::new().config(config).build());
//!
//!     let server = McpServerBuilder::new()
//!         .handler(McpHandler::new(state))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod explore;
pub mod protocol;
pub mod query;
pub mod server;
pub mod tools;

pub use config::{QueryConfig, QueryConfigBuilder, ServerConfig};
pub use database::{SqliteStore, StorageBackend, StoreManager};
pub use error::{McpError, Result};
pub use protocol::{McpServer, McpServerBuilder};
pub use query::{QueryPipeline, QueryRequest, ResponseEnvelope};
pub use server::{McpHandler, ServerState, ServerStateBuilder};
