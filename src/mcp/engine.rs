//! Per-session protocol engine
//!
//! A [`ProtocolEngine`] owns the request handlers of one session. It answers
//! the built-in lifecycle methods (`initialize`, `ping`, `logging/setLevel`)
//! itself and delegates everything else to handlers registered with
//! [`ProtocolEngine::set_request_handler`].
//!
//! Engines are never shared: [`EngineFactory::build`] creates a fresh one,
//! with fresh handler closures, for every session.
//!
//! # Usage
//!
//! ```rust,no_run
//! use netmcp::mcp::{EngineFactory, SessionTransport};
//! use netmcp::tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! let tools = Arc::new(ToolRegistry::with_default_tools().unwrap());
//! let factory = EngineFactory::new(tools);
//! let transport = Arc::new(SessionTransport::new("session-1"));
//! let engine = factory.build(transport);
//! ```

use crate::mcp::message::{JsonRpcMessage, JsonRpcRequest, INITIALIZE_METHOD, TOOLS_CALL_METHOD};
use crate::mcp::notifications::{ClientLogLevel, LoggingLevel};
use crate::mcp::transport::SessionTransport;
use crate::tools::{ToolCallOutcome, ToolRegistry};
use futures::future::BoxFuture;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation,
    InitializeRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::ErrorData;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PING_METHOD: &str = "ping";
pub const SET_LEVEL_METHOD: &str = "logging/setLevel";
pub const TOOLS_LIST_METHOD: &str = "tools/list";
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";
pub const CANCELLED_NOTIFICATION: &str = "notifications/cancelled";

/// Protocol revisions this server speaks, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

pub type RequestHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value, ErrorData>> + Send + Sync>;

pub struct ProtocolEngine {
    server_info: ServerInfo,
    transport: Arc<SessionTransport>,
    handlers: HashMap<&'static str, RequestHandler>,
    log_level: ClientLogLevel,
    initialized: AtomicBool,
    closed: AtomicBool,
}

impl ProtocolEngine {
    pub fn new(server_info: ServerInfo, transport: Arc<SessionTransport>) -> Self {
        Self {
            server_info,
            transport,
            handlers: HashMap::new(),
            log_level: ClientLogLevel::default(),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Registers the handler for `method`, replacing any previous one.
    pub fn set_request_handler<F, Fut>(&mut self, method: &'static str, handler: F)
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ErrorData>> + Send + 'static,
    {
        let handler: RequestHandler = Arc::new(
            move |params: Option<Value>| -> BoxFuture<'static, Result<Value, ErrorData>> {
                Box::pin(handler(params))
            },
        );
        self.handlers.insert(method, handler);
    }

    pub fn session_id(&self) -> &str {
        self.transport.session_id()
    }

    pub fn transport(&self) -> &Arc<SessionTransport> {
        &self.transport
    }

    pub fn log_level(&self) -> ClientLogLevel {
        self.log_level.clone()
    }

    /// True once the client has confirmed the handshake with
    /// `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Handles one inbound message. Only requests produce a reply.
    pub async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification.method);
                None
            }
            JsonRpcMessage::Response(response) => {
                tracing::debug!(
                    session_id = %self.session_id(),
                    id = %response.id,
                    "Ignoring client response"
                );
                None
            }
            JsonRpcMessage::Error(error) => {
                tracing::debug!(
                    session_id = %self.session_id(),
                    code = error.error.code,
                    message = %error.error.message,
                    "Ignoring client error response"
                );
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        if self.is_closed() {
            return JsonRpcMessage::error(
                Some(id),
                internal_error(format!("Session {} is closed", self.session_id())),
            );
        }

        let result = match method.as_str() {
            INITIALIZE_METHOD => self.initialize(params),
            PING_METHOD => Ok(json!({})),
            SET_LEVEL_METHOD => self.set_level(params),
            other => match self.handlers.get(other) {
                Some(handler) => handler(params).await,
                None => Err(ErrorData {
                    code: ErrorCode::METHOD_NOT_FOUND,
                    message: format!("Method '{}' not found", other).into(),
                    data: None,
                }),
            },
        };

        match result {
            Ok(value) => JsonRpcMessage::response(id, value),
            Err(error) => {
                tracing::debug!(
                    session_id = %self.session_id(),
                    method = %method,
                    error = %error.message,
                    "Request failed"
                );
                JsonRpcMessage::error(Some(id), error)
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            INITIALIZED_NOTIFICATION => {
                self.initialized.store(true, Ordering::SeqCst);
                tracing::debug!(session_id = %self.session_id(), "Client confirmed initialization");
            }
            CANCELLED_NOTIFICATION => {
                tracing::debug!(
                    session_id = %self.session_id(),
                    "Cancellation requested; in-flight calls run to completion"
                );
            }
            other => {
                tracing::debug!(session_id = %self.session_id(), method = %other, "Ignoring notification");
            }
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, ErrorData> {
        let params: InitializeRequestParam = parse_params(params)?;

        tracing::info!(
            session_id = %self.session_id(),
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "Initializing session"
        );

        let mut result = serde_json::to_value(&self.server_info)
            .map_err(|e| internal_error(format!("Failed to serialize server info: {}", e)))?;
        result["protocolVersion"] =
            Value::from(negotiate_protocol_version(&params.protocol_version.to_string()));

        Ok(result)
    }

    fn set_level(&self, params: Option<Value>) -> Result<Value, ErrorData> {
        #[derive(Deserialize)]
        struct SetLevelParams {
            level: LoggingLevel,
        }

        let SetLevelParams { level } = parse_params(params)?;
        self.log_level.set(level);
        tracing::debug!(session_id = %self.session_id(), ?level, "Client log level set");

        Ok(json!({}))
    }

    /// Closes the engine and its transport.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.transport.close();
        tracing::info!(session_id = %self.session_id(), "Session engine closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Builds one fresh engine per session, wired to the shared tool registry
pub struct EngineFactory {
    tools: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl EngineFactory {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            name: "netmcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_logging()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some("Network diagnostics over MCP. Call tools/list to see available tools.".to_string()),
        }
    }

    pub fn build(&self, transport: Arc<SessionTransport>) -> ProtocolEngine {
        let mut engine = ProtocolEngine::new(self.server_info(), transport);

        let tools = self.tools.clone();
        engine.set_request_handler(TOOLS_LIST_METHOD, move |_params| {
            let tools = tools.clone();
            async move { Ok(json!({ "tools": tools.list() })) }
        });

        let tools = self.tools.clone();
        engine.set_request_handler(TOOLS_CALL_METHOD, move |params| {
            let tools = tools.clone();
            async move { call_tool(&tools, params).await }
        });

        engine
    }
}

async fn call_tool(tools: &ToolRegistry, params: Option<Value>) -> Result<Value, ErrorData> {
    let CallToolRequestParam { name, arguments } = parse_params(params)?;

    let result = match tools.call(&name, arguments).await {
        ToolCallOutcome::Completed(output) => {
            let text = output.into_value().to_string();
            tracing::debug!(tool = %name, result = %text, "Tool call completed");
            CallToolResult::success(vec![Content::text(text)])
        }
        ToolCallOutcome::UnknownTool(name) => {
            tracing::warn!(tool = %name, "Unknown tool called");
            CallToolResult::success(vec![Content::text(format!(
                "Unknown tool called: {}",
                name
            ))])
        }
        ToolCallOutcome::InvalidArguments(e) => {
            tracing::warn!(tool = %name, error = %e, "Tool arguments rejected");
            return Err(e.into());
        }
    };

    serde_json::to_value(&result)
        .map_err(|e| internal_error(format!("Failed to serialize tool result: {}", e)))
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, ErrorData> {
    let params = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| ErrorData {
        code: ErrorCode::INVALID_PARAMS,
        message: format!("Invalid params: {}", e).into(),
        data: None,
    })
}

fn internal_error(message: String) -> ErrorData {
    ErrorData {
        code: ErrorCode::INTERNAL_ERROR,
        message: message.into(),
        data: None,
    }
}

fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|supported| *supported == requested)
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}
