//! Unsolicited server-to-client notifications
//!
//! Pushes are fire-and-forget: nothing is acknowledged or retried, and a push
//! on a session without an open stream is silently dropped by the transport.

use crate::mcp::message::JsonRpcMessage;
use crate::mcp::transport::SessionTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};

pub const LOGGING_MESSAGE_METHOD: &str = "notifications/message";
pub const CONNECTION_ESTABLISHED: &str = "SSE Connection established";

/// Client-facing log severity, lowest first
///
/// Declared here rather than reusing `rmcp::model::LoggingLevel`, which has no
/// ordering; filtering needs `Ord`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    #[default]
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

/// Minimum level a session's client asked to receive
///
/// Shared between the engine's `logging/setLevel` handler and the pusher.
#[derive(Debug, Clone, Default)]
pub struct ClientLogLevel(Arc<Mutex<LoggingLevel>>);

impl ClientLogLevel {
    pub fn get(&self) -> LoggingLevel {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, level: LoggingLevel) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = level;
    }

    pub fn allows(&self, level: LoggingLevel) -> bool {
        level >= self.get()
    }
}

pub struct NotificationPusher {
    transport: Arc<SessionTransport>,
    level: ClientLogLevel,
}

impl NotificationPusher {
    pub fn new(transport: Arc<SessionTransport>, level: ClientLogLevel) -> Self {
        Self { transport, level }
    }

    /// Pushes an arbitrary notification. Returns whether a stream took it.
    pub fn push(&self, method: &str, params: Option<Value>) -> bool {
        self.transport
            .send(JsonRpcMessage::notification(method, params))
    }

    /// Pushes a `notifications/message` log entry if the client's level allows it.
    pub fn log(&self, level: LoggingLevel, data: Value) -> bool {
        if !self.level.allows(level) {
            tracing::trace!(
                session_id = %self.transport.session_id(),
                ?level,
                "Log notification below client level"
            );
            return false;
        }

        self.push(
            LOGGING_MESSAGE_METHOD,
            Some(json!({ "level": level, "data": data })),
        )
    }

    /// Signals a freshly attached stream. Sent once per attach.
    pub fn connection_established(&self) -> bool {
        self.log(LoggingLevel::Info, Value::from(CONNECTION_ESTABLISHED))
    }
}
