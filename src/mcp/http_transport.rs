//! HTTP framing for routed replies
//!
//! # URL Structure
//!
//! - `POST {endpoint}` - Send one JSON-RPC message or a batch, receive the replies as JSON
//! - `GET {endpoint}` - Open the session's SSE stream for server-initiated messages
//!
//! # Usage
//!
//! ```http
//! POST /mcp
//! Content-Type: application/json
//!
//! {"jsonrpc":"2.0","id":1,"method":"initialize","params":{...}}
//! ```
//!
//! Response:
//! ```http
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//! Mcp-Session-Id: 550e8400-e29b-41d4-a716-446655440000
//!
//! {"jsonrpc":"2.0","id":1,"result":{...}}
//! ```

use crate::mcp::message::JsonRpcMessage;
use crate::mcp::router::{Reply, RoutedReply, StreamAttachment};
use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{Stream, StreamExt};
use std::time::Duration;

pub const SESSION_ID_HEADER: &str = "mcp-session-id";

pub fn session_header_name() -> HeaderName {
    HeaderName::from_static(SESSION_ID_HEADER)
}

/// Extracts the session id header.
///
/// A header that is present but not valid UTF-8 is treated as absent.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Renders a routed reply as an HTTP response
///
/// * `Reply::Single` / `Reply::Batch` - `200 OK` with a JSON body
/// * `Reply::Accepted` - `202 Accepted` with an empty body
///
/// The session header is attached when the POST created a session.
pub fn into_http_response(routed: RoutedReply) -> Response {
    let mut response = match routed.reply {
        Reply::Single(message) => (StatusCode::OK, Json(message)).into_response(),
        Reply::Batch(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Reply::Accepted => StatusCode::ACCEPTED.into_response(),
    };

    if let Some(session_id) = routed.session_id {
        match HeaderValue::from_str(&session_id) {
            Ok(value) => {
                response.headers_mut().insert(session_header_name(), value);
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Session id is not a valid header value");
            }
        }
    }

    response
}

/// Turns an attached stream into an SSE response.
///
/// Each pushed message becomes one `message` event carrying the JSON envelope.
pub fn into_sse_response(attachment: StreamAttachment, keep_alive: Option<Duration>) -> Response {
    let StreamAttachment {
        session_id,
        receiver,
    } = attachment;

    let stream = event_stream(receiver);
    let sse = match keep_alive {
        Some(interval) => Sse::new(stream)
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => Sse::new(stream).into_response(),
    };

    let mut response = sse;
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(session_header_name(), value);
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn event_stream(
    receiver: impl Stream<Item = JsonRpcMessage> + Send + 'static,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    receiver.map(|message| Event::default().event("message").json_data(message))
}
