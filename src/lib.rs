pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use config::ServerConfig;
use mcp::{EngineFactory, RequestRouter, SessionRegistry, SharedRegistry};
use tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub registry: SharedRegistry,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires a fresh session registry and engine factory around `tools`.
    pub fn new(config: ServerConfig, tools: ToolRegistry) -> Self {
        let registry = SessionRegistry::shared();
        let factory = Arc::new(EngineFactory::new(Arc::new(tools)));
        let router = Arc::new(RequestRouter::new(registry.clone(), factory));

        Self {
            router,
            registry,
            config: Arc::new(config),
        }
    }
}
