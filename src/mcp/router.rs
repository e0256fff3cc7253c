//! Request router and handshake gate
//!
//! Every inbound POST is classified by whether it carries a session id:
//!
//! ```text
//!             ┌── no session id ──► initialize? ── yes ──► new session
//!  POST ──────┤                                  └─ no ──► BadRequest
//!             └── session id ─────► initialize? ── yes ──► BadRequest
//!                                   lookup ── hit ──► forward to engine
//!                                          └─ miss ─► InvalidSession
//! ```
//!
//! A GET attaches the read-side stream of an existing session and triggers
//! one "connection established" notification per attach.

use crate::error::RouterError;
use crate::mcp::engine::EngineFactory;
use crate::mcp::message::{JsonRpcMessage, Payload, TOOLS_CALL_METHOD};
use crate::mcp::registry::{RegistryError, SharedRegistry};
use crate::mcp::session::Session;
use crate::mcp::transport::{SessionTransport, StreamReceiver};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// What goes back on the HTTP response of a POST
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
    /// The body held only notifications or responses
    Accepted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedReply {
    /// Set when this POST created a new session
    pub session_id: Option<String>,
    pub reply: Reply,
}

/// Read-side stream handed to a GET request
pub struct StreamAttachment {
    pub session_id: String,
    pub receiver: StreamReceiver,
}

pub struct RequestRouter {
    registry: SharedRegistry,
    factory: Arc<EngineFactory>,
}

impl RequestRouter {
    pub fn new(registry: SharedRegistry, factory: Arc<EngineFactory>) -> Self {
        Self { registry, factory }
    }

    /// Routes one POST body
    ///
    /// # Arguments
    ///
    /// * `session_id` - Value of the session header, if present
    /// * `body` - Parsed JSON body: one message or a batch
    ///
    /// # Returns
    ///
    /// * `Ok(RoutedReply)` - Messages handled by a new or existing session
    /// * `Err(RouterError::BadRequest)` - Not an initialize and no session,
    ///   or an initialize aimed at an existing session
    /// * `Err(RouterError::InvalidSession)` - Unknown session id
    /// * `Err(RouterError::ShuttingDown)` - Registry is draining
    pub async fn route_post(
        &self,
        session_id: Option<&str>,
        body: Value,
    ) -> Result<RoutedReply, RouterError> {
        let payload = Payload::from_value(body).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed JSON-RPC body");
            RouterError::BadRequest(e.to_string())
        })?;

        if !self.registry.read().await.is_accepting() {
            return Err(RouterError::ShuttingDown);
        }

        match session_id {
            Some(session_id) => self.forward(session_id, payload).await,
            None if payload.contains_initialize() => self.initialize(payload).await,
            None => {
                tracing::warn!("Bad Request: no valid session ID provided");
                Err(RouterError::BadRequest(
                    "No valid session ID provided".to_string(),
                ))
            }
        }
    }

    /// Attaches the read-side stream of an existing session.
    pub async fn route_get(
        &self,
        session_id: Option<&str>,
    ) -> Result<StreamAttachment, RouterError> {
        let Some(session_id) = session_id else {
            tracing::warn!("Stream requested without a session ID");
            return Err(RouterError::BadRequest(
                "Missing session ID".to_string(),
            ));
        };

        tracing::info!(session_id = %session_id, "GET stream");

        let session = self.lookup(session_id).await?;
        let receiver = session.attach_stream().map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "Invalid session ID");
            RouterError::InvalidSession(session_id.to_string())
        })?;

        session.notifications().connection_established();

        Ok(StreamAttachment {
            session_id: session_id.to_string(),
            receiver,
        })
    }

    async fn initialize(&self, payload: Payload) -> Result<RoutedReply, RouterError> {
        let session_id = Uuid::new_v4().to_string();
        let transport = Arc::new(SessionTransport::new(session_id.clone()));
        let engine = self.factory.build(transport.clone());
        let session = Arc::new(Session::new(transport, engine));

        let is_batch = payload.is_batch();
        let init_ids: Vec<_> = payload
            .messages()
            .iter()
            .filter(|m| m.is_initialize())
            .filter_map(|m| match m {
                JsonRpcMessage::Request(r) => Some(r.id.clone()),
                _ => None,
            })
            .collect();

        let replies = session.handle_messages(payload.into_messages()).await;

        let handshake_ok = replies.iter().any(|reply| {
            matches!(reply, JsonRpcMessage::Response(r) if init_ids.contains(&r.id))
        });

        if !handshake_ok {
            tracing::warn!(session_id = %session_id, "Initialize handshake failed, session discarded");
            session.close().await;
            return Ok(RoutedReply {
                session_id: None,
                reply: to_reply(replies, is_batch),
            });
        }

        if let Err(e) = self.registry.write().await.create(session.clone()) {
            session.close().await;
            return Err(match e {
                RegistryError::Closed => RouterError::ShuttingDown,
                other => {
                    tracing::error!(session_id = %session_id, error = %other, "Failed to register session");
                    RouterError::Internal(other.to_string())
                }
            });
        }

        tracing::info!(session_id = %session_id, "Session initialized");

        Ok(RoutedReply {
            session_id: Some(session_id),
            reply: to_reply(replies, is_batch),
        })
    }

    async fn forward(&self, session_id: &str, payload: Payload) -> Result<RoutedReply, RouterError> {
        if payload.mentions_initialize() {
            tracing::warn!(session_id = %session_id, "Bad Request: initialize sent on an existing session");
            return Err(RouterError::BadRequest(
                "Session is already initialized".to_string(),
            ));
        }

        let session = self.lookup(session_id).await?;

        for message in payload.messages() {
            if let JsonRpcMessage::Request(request) = message {
                if request.method == TOOLS_CALL_METHOD {
                    let params = request
                        .params
                        .as_ref()
                        .map(Value::to_string)
                        .unwrap_or_default();
                    tracing::info!(session_id = %session_id, params = %params, "Calling tool");
                }
            }
        }

        let is_batch = payload.is_batch();
        let replies = session.handle_messages(payload.into_messages()).await;

        Ok(RoutedReply {
            session_id: None,
            reply: to_reply(replies, is_batch),
        })
    }

    async fn lookup(&self, session_id: &str) -> Result<Arc<Session>, RouterError> {
        self.registry
            .read()
            .await
            .lookup(session_id)
            .map_err(|_| {
                tracing::error!(session_id = %session_id, "Invalid session ID");
                RouterError::InvalidSession(session_id.to_string())
            })
    }
}

fn to_reply(mut replies: Vec<JsonRpcMessage>, is_batch: bool) -> Reply {
    if replies.is_empty() {
        Reply::Accepted
    } else if !is_batch && replies.len() == 1 {
        Reply::Single(replies.remove(0))
    } else {
        Reply::Batch(replies)
    }
}
