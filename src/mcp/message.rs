//! JSON-RPC 2.0 envelopes exchanged with MCP clients
//!
//! A POST body is either a single message or a batch. Messages are classified
//! structurally: an object with `method` and `id` is a request, `method`
//! without `id` is a notification, `result` is a response and `error` is an
//! error response.

use rmcp::model::InitializeRequestParam;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";

pub const INITIALIZE_METHOD: &str = "initialize";
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// The literal `"jsonrpc": "2.0"` marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(de::Error::custom(format!(
                "unsupported jsonrpc version '{}'",
                version
            )))
        }
    }
}

/// Correlation id of a request
///
/// Numbers are kept as the client sent them, fractional or beyond `i64`
/// included, so the reply echoes the exact id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(Number),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Notifications never carry an `id`; unknown fields are refused so that a
/// request with a malformed id is not mistaken for one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: ErrorObject,
}

/// Any single JSON-RPC message
///
/// Variant order matters for deserialization: a request is tried before a
/// notification so that an `id` is never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
    Error(JsonRpcErrorResponse),
}

impl JsonRpcMessage {
    pub fn request(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcMessage::Request(JsonRpcRequest {
            jsonrpc: JsonRpcVersion,
            id,
            method: method.into(),
            params,
        })
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        })
    }

    pub fn response(id: RequestId, result: Value) -> Self {
        JsonRpcMessage::Response(JsonRpcResponse {
            jsonrpc: JsonRpcVersion,
            id,
            result,
        })
    }

    pub fn error(id: Option<RequestId>, error: rmcp::ErrorData) -> Self {
        JsonRpcMessage::Error(JsonRpcErrorResponse {
            jsonrpc: JsonRpcVersion,
            id,
            error: ErrorObject {
                code: error.code.0,
                message: error.message.into_owned(),
                data: error.data,
            },
        })
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(r) => Some(&r.method),
            JsonRpcMessage::Notification(n) => Some(&n.method),
            _ => None,
        }
    }

    /// Structural check against the initialize handshake shape
    ///
    /// Requires the `initialize` method and params carrying a protocol
    /// version, a capabilities object and the client's name and version.
    pub fn is_initialize(&self) -> bool {
        match self {
            JsonRpcMessage::Request(request) if request.method == INITIALIZE_METHOD => request
                .params
                .clone()
                .map(|params| serde_json::from_value::<InitializeRequestParam>(params).is_ok())
                .unwrap_or(false),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("empty batch")]
    EmptyBatch,

    #[error("invalid JSON-RPC message: {0}")]
    Invalid(String),
}

/// Body of a POST request: one message or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl Payload {
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(MessageError::EmptyBatch);
                }
                let messages = items
                    .into_iter()
                    .map(parse_message)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Payload::Batch(messages))
            }
            other => Ok(Payload::Single(parse_message(other)?)),
        }
    }

    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            Payload::Single(message) => std::slice::from_ref(message),
            Payload::Batch(messages) => messages,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// True when any message in the body is an initialize handshake.
    pub fn contains_initialize(&self) -> bool {
        self.messages().iter().any(JsonRpcMessage::is_initialize)
    }

    /// True when any message in the body names the initialize method,
    /// whether or not its params are well formed.
    pub fn mentions_initialize(&self) -> bool {
        self.messages()
            .iter()
            .any(|m| m.method() == Some(INITIALIZE_METHOD))
    }

    pub fn into_messages(self) -> Vec<JsonRpcMessage> {
        match self {
            Payload::Single(message) => vec![message],
            Payload::Batch(messages) => messages,
        }
    }
}

fn parse_message(value: Value) -> Result<JsonRpcMessage, MessageError> {
    serde_json::from_value(value).map_err(|e| MessageError::Invalid(e.to_string()))
}
