pub mod test_helpers {
    use crate::config::ServerConfig;
    use crate::mcp::engine::EngineFactory;
    use crate::mcp::message::{JsonRpcMessage, RequestId};
    use crate::mcp::session::Session;
    use crate::mcp::transport::SessionTransport;
    use crate::tools::{
        AddressInfo, DnsLookupTool, HostResolver, LookupError, ToolOutput, ToolRegistry,
        TypedTool,
    };
    use crate::AppState;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use serde_valid::Validate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    pub const TEST_PROTOCOL_VERSION: &str = "2025-03-26";

    /// JSON body of a well-formed initialize request
    pub fn initialize_body(id: i64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": TEST_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }
        })
    }

    pub fn initialize_request(id: i64) -> JsonRpcMessage {
        serde_json::from_value(initialize_body(id)).expect("valid initialize request")
    }

    pub fn request_body(id: i64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    pub fn tool_call_body(id: i64, name: &str, arguments: Value) -> Value {
        request_body(id, "tools/call", json!({"name": name, "arguments": arguments}))
    }

    pub fn tool_call_request(id: i64, name: &str, arguments: Value) -> JsonRpcMessage {
        JsonRpcMessage::request(
            RequestId::Number(id.into()),
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        )
    }

    /// Resolver answering from a fixed table; unknown hosts fail
    #[derive(Debug, Clone, Default)]
    pub struct StaticResolver {
        entries: HashMap<String, AddressInfo>,
        lookups: Arc<AtomicUsize>,
    }

    impl StaticResolver {
        pub fn with_entry(mut self, host: &str, address: &str, family: u8) -> Self {
            self.entries.insert(
                host.to_string(),
                AddressInfo {
                    address: address.to_string(),
                    family,
                },
            );
            self
        }

        pub fn lookups(&self) -> Arc<AtomicUsize> {
            self.lookups.clone()
        }
    }

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn lookup(&self, host: &str) -> Result<AddressInfo, LookupError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.entries
                .get(host)
                .cloned()
                .ok_or_else(|| LookupError::NoAddress(host.to_string()))
        }
    }

    #[derive(Debug, Deserialize, Validate)]
    pub struct EchoArgs {
        #[validate(min_length = 1)]
        pub value: String,
    }

    fn echo_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"value": {"type": "string", "minLength": 1}},
            "required": ["value"]
        })
    }

    /// Tool that echoes its argument and counts invocations
    pub struct CountingTool {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CountingTool {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn calls(&self) -> Arc<AtomicUsize> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl TypedTool for CountingTool {
        type Args = EchoArgs;

        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "Echo the given value"
        }

        fn input_schema(&self) -> Value {
            echo_schema()
        }

        async fn call(&self, args: EchoArgs) -> ToolOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ToolOutput::Success(json!({"echo": args.value}))
        }
    }

    /// Tool that holds each call for a while and records how many overlap
    pub struct SlowTool {
        delay: Duration,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        entries: Arc<Mutex<Vec<String>>>,
    }

    impl SlowTool {
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                active: Arc::new(AtomicUsize::new(0)),
                max_active: Arc::new(AtomicUsize::new(0)),
                entries: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Highest number of handlers seen running at the same time
        pub fn max_active(&self) -> Arc<AtomicUsize> {
            self.max_active.clone()
        }

        /// Argument values in the order handlers were entered
        pub fn entries(&self) -> Arc<Mutex<Vec<String>>> {
            self.entries.clone()
        }
    }

    #[async_trait]
    impl TypedTool for SlowTool {
        type Args = EchoArgs;

        fn name(&self) -> &'static str {
            "slow"
        }

        fn description(&self) -> &'static str {
            "Echo the given value after a delay"
        }

        fn input_schema(&self) -> Value {
            echo_schema()
        }

        async fn call(&self, args: EchoArgs) -> ToolOutput {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.entries.lock().unwrap().push(args.value.clone());

            tokio::time::sleep(self.delay).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            ToolOutput::Success(json!({"echo": args.value}))
        }
    }

    /// Tool whose handler blocks until released
    #[derive(Default)]
    pub struct GatedTool {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl GatedTool {
        /// Notified once a call is inside the handler
        pub fn entered(&self) -> Arc<Notify> {
            self.entered.clone()
        }

        /// Notify to let the blocked call finish
        pub fn release(&self) -> Arc<Notify> {
            self.release.clone()
        }
    }

    #[async_trait]
    impl TypedTool for GatedTool {
        type Args = EchoArgs;

        fn name(&self) -> &'static str {
            "gated"
        }

        fn description(&self) -> &'static str {
            "Echo the given value once released"
        }

        fn input_schema(&self) -> Value {
            echo_schema()
        }

        async fn call(&self, args: EchoArgs) -> ToolOutput {
            self.entered.notify_one();
            self.release.notified().await;
            ToolOutput::Success(json!({"echo": args.value}))
        }
    }

    /// Tool whose handler panics
    pub struct PanickingTool;

    #[async_trait]
    impl TypedTool for PanickingTool {
        type Args = EchoArgs;

        fn name(&self) -> &'static str {
            "panic"
        }

        fn description(&self) -> &'static str {
            "Always panics"
        }

        fn input_schema(&self) -> Value {
            echo_schema()
        }

        async fn call(&self, args: EchoArgs) -> ToolOutput {
            panic!("handler failed on {}", args.value)
        }
    }

    /// Tool registry with a stubbed `dns-lookup` (example.com, localhost) and `echo`
    pub fn test_tools() -> ToolRegistry {
        let resolver = StaticResolver::default()
            .with_entry("example.com", "93.184.215.14", 4)
            .with_entry("localhost", "::1", 6);

        let mut tools = ToolRegistry::new();
        tools
            .register(DnsLookupTool::new(resolver))
            .expect("register dns-lookup");
        tools
            .register(CountingTool::new("echo"))
            .expect("register echo");
        tools
    }

    pub fn build_session(session_id: &str) -> Session {
        build_session_with_tools(session_id, test_tools())
    }

    pub fn build_session_with_tools(session_id: &str, tools: ToolRegistry) -> Session {
        let factory = EngineFactory::new(Arc::new(tools));
        let transport = Arc::new(SessionTransport::new(session_id));
        let engine = factory.build(transport.clone());
        Session::new(transport, engine)
    }

    pub fn test_state() -> AppState {
        AppState::new(ServerConfig::default(), test_tools())
    }

    pub fn test_state_with_tools(tools: ToolRegistry) -> AppState {
        AppState::new(ServerConfig::default(), tools)
    }
}
