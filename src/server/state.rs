//! Server state management.

use crate::config::ServerConfig;
use crate::database::StoreManager;
use crate::protocol::ClientInfo;
use crate::tools::ToolRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ServerState {
    pub config: ServerConfig,
    pub store_manager: Arc<StoreManager>,
    pub tools: ToolRegistry,
    initialized: AtomicBool,
    client_info: RwLock<Option<ClientInfo>>,
}

impl ServerState {
    pub fn new(config: ServerConfig, store_manager: Arc<StoreManager>, tools: ToolRegistry) -> Self {
        Self {
            config,
            store_manager,
            tools,
            initialized: AtomicBool::new(false),
            client_info: RwLock::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn set_initialized(&self, client_info: ClientInfo) {
        *self.client_info.write() = Some(client_info);
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.read().clone()
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    store_manager: Option<Arc<StoreManager>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store_manager: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store_manager(mut self, store_manager: Arc<StoreManager>) -> Self {
        self.store_manager = Some(store_manager);
        self
    }

    pub fn build(self) -> ServerState {
        let config = self.config.unwrap_or_default();
        let store_manager = self
            .store_manager
            .unwrap_or_else(|| Arc::new(StoreManager::new(config.query.clone())));

        let tools = crate::tools::create_registry(Arc::clone(&store_manager));

        ServerState::new(config, store_manager, tools)
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
