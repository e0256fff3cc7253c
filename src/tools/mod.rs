//! Tool registry
//!
//! Tools are immutable after startup. Each one declares a typed argument
//! contract ([`TypedTool::Args`]) that is deserialized and validated before
//! the handler runs, so a handler only ever sees well-formed input.
//!
//! A call has three distinct outcomes, see [`ToolCallOutcome`]:
//!
//! ```text
//! tools/call ──► lookup ──► unknown name ───────────► UnknownTool (payload)
//!                  │
//!                  └──► parse + validate ──► fail ──► InvalidArguments (protocol error)
//!                              │
//!                              └──► handler ────────► Completed(ToolOutput)
//! ```

pub mod dns_lookup;

pub use dns_lookup::{AddressInfo, DnsLookupTool, HostResolver, LookupError, SystemResolver};

use crate::error::{ToolError, ValidationError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use serde_valid::Validate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Value a tool handler hands back
///
/// Handlers never fail through the dispatch layer. A failure is data:
/// it is serialized as `{"type": "error", "value": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(Value),
    Failure(Value),
}

impl ToolOutput {
    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Success(value) => value,
            ToolOutput::Failure(value) => json!({ "type": "error", "value": value }),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }
}

/// Result of dispatching a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// The handler ran; its output may itself report a failure
    Completed(ToolOutput),
    /// No tool is registered under the name
    UnknownTool(String),
    /// Arguments broke the tool's contract; the handler was not invoked
    InvalidArguments(ValidationError),
}

/// A capability with a typed, validated argument contract
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Args: DeserializeOwned + serde_valid::Validate + Send + 'static;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema advertised in `tools/list`
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Self::Args) -> ToolOutput;
}

#[async_trait]
trait DynTool: Send + Sync {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ValidationError>;
}

#[async_trait]
impl<T: TypedTool> DynTool for T {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ValidationError> {
        let args: T::Args = serde_json::from_value(Value::Object(arguments)).map_err(|e| {
            ValidationError::Malformed {
                tool: self.name().to_string(),
                detail: e.to_string(),
            }
        })?;

        args.validate().map_err(|errors| ValidationError::Rejected {
            tool: self.name().to_string(),
            detail: errors.to_string(),
        })?;

        Ok(self.call(args).await)
    }
}

/// One registered tool: its advertised definition plus its handler
#[derive(Clone)]
pub struct ToolDescriptor {
    definition: rmcp::model::Tool,
    handler: Arc<dyn DynTool>,
}

impl ToolDescriptor {
    pub fn new<T: TypedTool>(tool: T) -> Result<Self, ToolError> {
        let schema = match tool.input_schema() {
            Value::Object(map) => map,
            _ => return Err(ToolError::InvalidSchema(tool.name().to_string())),
        };

        let definition = rmcp::model::Tool {
            name: tool.name().into(),
            description: Some(tool.description().into()),
            input_schema: Arc::new(schema),
            annotations: None,
            title: None,
            icons: None,
            output_schema: None,
        };

        Ok(Self {
            definition,
            handler: Arc::new(tool),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Name-keyed collection of tools, read-only once the server is running
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the tools the server ships with.
    pub fn with_default_tools() -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(DnsLookupTool::new(SystemResolver))?;
        Ok(registry)
    }

    pub fn register<T: TypedTool>(&mut self, tool: T) -> Result<(), ToolError> {
        let descriptor = ToolDescriptor::new(tool)?;
        let name = descriptor.name().to_string();

        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Definitions of every tool, ordered by name. No side effects.
    pub fn list(&self) -> Vec<rmcp::model::Tool> {
        self.tools
            .values()
            .map(|descriptor| descriptor.definition.clone())
            .collect()
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> ToolCallOutcome {
        let Some(descriptor) = self.tools.get(name) else {
            return ToolCallOutcome::UnknownTool(name.to_string());
        };

        match descriptor
            .handler
            .invoke(arguments.unwrap_or_default())
            .await
        {
            Ok(output) => ToolCallOutcome::Completed(output),
            Err(e) => ToolCallOutcome::InvalidArguments(e),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
