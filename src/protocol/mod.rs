//! MCP protocol layer: wire types and the stdio server loop.

pub mod server;
pub mod types;

pub use server::{Dispatcher, Handler, McpServer, McpServerBuilder, StdioTransport, Transport};
pub use types::*;
