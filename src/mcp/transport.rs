//! Per-session transport binding
//!
//! A [`SessionTransport`] owns the server-to-client half of one session's
//! duplex channel: the currently attached SSE stream, if any. Request
//! responses travel back on the POST that carried the request; everything
//! unsolicited goes through [`SessionTransport::send`].

use crate::error::TransportError;
use crate::mcp::message::JsonRpcMessage;
use futures::channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type StreamReceiver = mpsc::UnboundedReceiver<JsonRpcMessage>;

pub struct SessionTransport {
    session_id: String,
    stream: Mutex<Option<mpsc::UnboundedSender<JsonRpcMessage>>>,
    closed: AtomicBool,
}

impl SessionTransport {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            stream: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Attaches a new read-side stream, replacing any previous one.
    ///
    /// The replaced stream ends as soon as its sender is dropped.
    pub fn attach_stream(&self) -> Result<StreamReceiver, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed(self.session_id.clone()));
        }

        let (tx, rx) = mpsc::unbounded();
        let previous = self.slot().replace(tx);
        if previous.is_some() {
            tracing::debug!(session_id = %self.session_id, "Replacing existing SSE stream");
        }

        Ok(rx)
    }

    /// Pushes a message onto the open stream without waiting for delivery.
    ///
    /// Returns `false` when no stream is open; that is not an error.
    pub fn send(&self, message: JsonRpcMessage) -> bool {
        let mut slot = self.slot();
        let Some(tx) = slot.as_ref() else {
            tracing::trace!(session_id = %self.session_id, "No open stream, dropping message");
            return false;
        };

        match tx.unbounded_send(message) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(session_id = %self.session_id, "SSE stream disconnected");
                *slot = None;
                false
            }
        }
    }

    pub fn is_stream_open(&self) -> bool {
        self.slot().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Closes the binding and ends any attached stream. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(tx) = self.slot().take() {
            tx.close_channel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<JsonRpcMessage>>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
