//! HTTP request handlers for the MCP endpoint
//!
//! These handlers only deal with HTTP concerns: header extraction, body
//! parsing and response framing. Session routing lives in
//! [`crate::mcp::router`].

use crate::error::RouterError;
use crate::mcp::http_transport::{
    into_http_response, into_sse_response, session_header_name, session_id_from_headers,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Handles JSON-RPC messages posted to the MCP endpoint
///
/// # Route
///
/// `POST {endpoint}`
///
/// # Returns
///
/// * `200 OK` - JSON reply (single or batch), with `mcp-session-id` when a session was created
/// * `202 Accepted` - Body held only notifications or responses
/// * `400 Bad Request` - Unparseable body, missing/invalid session, or misplaced initialize
/// * `503 Service Unavailable` - Server is shutting down
pub async fn mcp_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = session_id_from_headers(&headers);

    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Request body is not valid JSON");
            return RouterError::Parse(e.to_string()).into_response();
        }
    };

    match state.router.route_post(session_id.as_deref(), body).await {
        Ok(routed) => into_http_response(routed),
        Err(e) => e.into_response(),
    }
}

/// Opens the SSE stream of an existing session
///
/// # Route
///
/// `GET {endpoint}`
///
/// # Returns
///
/// * `200 OK` - `text/event-stream`; the first event announces the connection
/// * `400 Bad Request` - Session header missing or unknown
pub async fn mcp_get_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = session_id_from_headers(&headers);

    match state.router.route_get(session_id.as_deref()).await {
        Ok(attachment) => into_sse_response(attachment, state.config.sse_keep_alive),
        Err(e) => e.into_response(),
    }
}

/// Builds the application router for the configured endpoint.
pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AnyOrigin)
        .expose_headers([session_header_name()]);

    let endpoint = state.config.endpoint.clone();

    Router::new()
        .route(
            &endpoint,
            post(mcp_post_handler).get(mcp_get_handler),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(detail = %detail, "Error handling MCP request");
    RouterError::Internal(detail).into_response()
}
