//! A live MCP session
//!
//! Each [`Session`] owns exactly one transport binding and one protocol
//! engine. Messages for the same session are handled one at a time, in
//! arrival order, so replies never interleave.

use crate::error::TransportError;
use crate::mcp::engine::ProtocolEngine;
use crate::mcp::message::JsonRpcMessage;
use crate::mcp::notifications::NotificationPusher;
use crate::mcp::transport::{SessionTransport, StreamReceiver};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Session {
    id: String,
    transport: Arc<SessionTransport>,
    engine: ProtocolEngine,
    notifications: NotificationPusher,
    // tokio's Mutex is fair, so waiters are served in arrival order
    turn: Mutex<()>,
}

impl Session {
    pub fn new(transport: Arc<SessionTransport>, engine: ProtocolEngine) -> Self {
        let notifications = NotificationPusher::new(transport.clone(), engine.log_level());
        Self {
            id: transport.session_id().to_string(),
            transport,
            engine,
            notifications,
            turn: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> &Arc<SessionTransport> {
        &self.transport
    }

    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    pub fn notifications(&self) -> &NotificationPusher {
        &self.notifications
    }

    /// Feeds messages to the engine in order and collects the replies.
    pub async fn handle_messages(&self, messages: Vec<JsonRpcMessage>) -> Vec<JsonRpcMessage> {
        let _turn = self.turn.lock().await;

        let mut replies = Vec::new();
        for message in messages {
            if let Some(reply) = self.engine.handle(message).await {
                replies.push(reply);
            }
        }
        replies
    }

    pub fn attach_stream(&self) -> Result<StreamReceiver, TransportError> {
        self.transport.attach_stream()
    }

    /// Waits for the in-flight message, if any, then closes the engine.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub async fn close(&self) -> bool {
        let _turn = self.turn.lock().await;
        self.engine.close()
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }
}
