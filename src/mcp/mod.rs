//! Session-oriented MCP server over Streamable HTTP
//!
//! # Architecture
//!
//! - [`RequestRouter`] - Handshake gate; routes each POST/GET to a session
//! - [`SessionRegistry`] - Thread-safe map of live sessions
//! - [`Session`] - One transport binding plus one protocol engine, serialized per session
//! - [`ProtocolEngine`] / [`EngineFactory`] - Per-session handler set (initialize, tools/list, tools/call, ...)
//! - [`SessionTransport`] - Server-to-client SSE channel of a session
//! - [`NotificationPusher`] - Fire-and-forget notifications on that channel
//! - [`mcp_post_handler`] and [`mcp_get_handler`] - axum entry points
//!
//! # Example
//!
//! ```rust,no_run
//! use netmcp::mcp::{EngineFactory, RequestRouter, SessionRegistry};
//! use netmcp::tools::ToolRegistry;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SessionRegistry::shared();
//! let factory = Arc::new(EngineFactory::new(Arc::new(ToolRegistry::with_default_tools()?)));
//! let router = RequestRouter::new(registry.clone(), factory);
//!
//! let routed = router
//!     .route_post(None, json!({
//!         "jsonrpc": "2.0",
//!         "id": 1,
//!         "method": "initialize",
//!         "params": {
//!             "protocolVersion": "2025-03-26",
//!             "capabilities": {},
//!             "clientInfo": {"name": "example", "version": "1.0.0"}
//!         }
//!     }))
//!     .await?;
//! assert!(routed.session_id.is_some());
//!
//! registry.write().await.remove_all().await;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod handlers;
pub mod http_transport;
pub mod message;
pub mod notifications;
pub mod registry;
pub mod router;
pub mod session;
pub mod transport;

pub use engine::{EngineFactory, ProtocolEngine};
pub use handlers::{mcp_get_handler, mcp_post_handler, routes};
pub use notifications::{LoggingLevel, NotificationPusher};
pub use registry::{RegistryError, SessionRegistry, SharedRegistry};
pub use router::{Reply, RequestRouter, RoutedReply, StreamAttachment};
pub use session::Session;
pub use transport::SessionTransport;
