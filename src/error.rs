use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC error code for requests that are neither a valid initialize nor
/// attributable to a live session.
pub const BAD_REQUEST_CODE: i32 = -32000;
/// JSON-RPC error code for a session id that is not registered.
pub const INVALID_SESSION_CODE: i32 = -32001;
/// JSON-RPC error code returned once the server has started draining.
pub const SHUTTING_DOWN_CODE: i32 = -32002;
pub const PARSE_ERROR_CODE: i32 = -32700;
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Faults detected by the request router before a message reaches an engine
///
/// Every variant is rendered as an HTTP status plus a JSON-RPC error body:
///
/// | Variant          | HTTP | JSON-RPC code |
/// |------------------|------|---------------|
/// | BadRequest       | 400  | -32000        |
/// | InvalidSession   | 400  | -32001        |
/// | ShuttingDown     | 503  | -32002        |
/// | Parse            | 400  | -32700        |
/// | Internal         | 500  | -32603        |
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// The carried value is the session id the client sent.
    #[error("Invalid session ID")]
    InvalidSession(String),

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error("Parse error: {0}")]
    Parse(String),

    /// The detail is logged but never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl RouterError {
    pub fn code(&self) -> i32 {
        match self {
            RouterError::BadRequest(_) => BAD_REQUEST_CODE,
            RouterError::InvalidSession(_) => INVALID_SESSION_CODE,
            RouterError::ShuttingDown => SHUTTING_DOWN_CODE,
            RouterError::Parse(_) => PARSE_ERROR_CODE,
            RouterError::Internal(_) => INTERNAL_ERROR_CODE,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::BadRequest(_) | RouterError::InvalidSession(_) | RouterError::Parse(_) => {
                StatusCode::BAD_REQUEST
            }
            RouterError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the JSON-RPC error envelope sent back to the client.
    ///
    /// Router faults are not tied to a request id the server could trust, so
    /// the envelope carries a freshly minted token instead.
    pub fn to_body(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            },
            "id": uuid::Uuid::new_v4().to_string(),
        })
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_body())).into_response()
    }
}

/// Tool arguments rejected before the handler runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Arguments do not have the shape the tool's contract requires
    #[error("Invalid arguments for tool '{tool}': {detail}")]
    Malformed { tool: String, detail: String },

    /// Arguments have the right shape but break a field rule
    #[error("Arguments for tool '{tool}' failed validation: {detail}")]
    Rejected { tool: String, detail: String },
}

impl From<ValidationError> for rmcp::ErrorData {
    fn from(err: ValidationError) -> Self {
        rmcp::ErrorData {
            code: rmcp::model::ErrorCode::INVALID_PARAMS,
            message: err.to_string().into(),
            data: None,
        }
    }
}

/// Tool registry construction errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Input schema for tool '{0}' is not a JSON object")]
    InvalidSchema(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport for session {0} is closed")]
    Closed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_error_body_shape() {
        let body = RouterError::BadRequest("no session".to_string()).to_body();

        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["error"]["code"], BAD_REQUEST_CODE);
        assert_eq!(body["error"]["message"], "Bad Request: no session");
        assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_router_error_status_mapping() {
        assert_eq!(
            RouterError::InvalidSession("abc".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RouterError::ShuttingDown.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RouterError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let body = RouterError::Internal("secret stack trace".into()).to_body();
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_invalid_session_does_not_echo_id() {
        let body = RouterError::InvalidSession("client-supplied".into()).to_body();
        assert_eq!(body["error"]["code"], INVALID_SESSION_CODE);
        assert_eq!(body["error"]["message"], "Invalid session ID");
    }

    #[test]
    fn test_validation_error_maps_to_invalid_params() {
        let err = ValidationError::Malformed {
            tool: "dns-lookup".into(),
            detail: "missing field `host`".into(),
        };
        let data: rmcp::ErrorData = err.into();
        assert_eq!(data.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(data.message.contains("dns-lookup"));
    }
}
