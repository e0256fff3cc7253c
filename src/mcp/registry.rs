//! Thread-safe session registry
//!
//! The registry is the single source of truth for which sessions are live.
//! It is shared as [`SharedRegistry`] (`Arc<RwLock<SessionRegistry>>`);
//! handlers take the lock only long enough to insert or clone out a session.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► create()/lookup() while serving ──► remove_all() at shutdown
//! ```
//!
//! After [`SessionRegistry::remove_all`] the registry refuses new sessions.

use crate::mcp::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already registered: {0}")]
    DuplicateSession(String),

    #[error("Registry is closed")]
    Closed,
}

pub type SharedRegistry = Arc<RwLock<SessionRegistry>>;

pub struct SessionRegistry {
    sessions: HashMap<String, Arc<Session>>,
    accepting: bool,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            accepting: true,
        }
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Registers a live session under its id
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Session registered
    /// * `Err(RegistryError::DuplicateSession)` - Id already taken
    /// * `Err(RegistryError::Closed)` - Registry has been drained
    pub fn create(&mut self, session: Arc<Session>) -> Result<(), RegistryError> {
        if !self.accepting {
            return Err(RegistryError::Closed);
        }

        let id = session.id().to_string();
        if self.sessions.contains_key(&id) {
            return Err(RegistryError::DuplicateSession(id));
        }

        self.sessions.insert(id, session);
        Ok(())
    }

    pub fn lookup(&self, session_id: &str) -> Result<Arc<Session>, RegistryError> {
        self.sessions
            .get(session_id)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::NotFound(session_id.to_string()))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    /// Stops accepting sessions, closes every live engine and empties the registry.
    ///
    /// Returns the number of engines this call closed.
    pub async fn remove_all(&mut self) -> usize {
        let sessions = self.stop_accepting();
        close_sessions(sessions).await
    }

    /// Stops accepting sessions and takes every live one out of the registry.
    pub fn stop_accepting(&mut self) -> Vec<Arc<Session>> {
        self.accepting = false;
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// Shutdown drain for the shared registry
    ///
    /// The write lock is held only while taking the sessions out. Closing
    /// waits for in-flight messages, and during that wait other requests
    /// still read the registry and get turned away as shutting down.
    pub async fn drain(registry: &SharedRegistry) -> usize {
        let sessions = registry.write().await.stop_accepting();
        close_sessions(sessions).await
    }
}

async fn close_sessions(sessions: Vec<Arc<Session>>) -> usize {
    let mut closed = 0;

    for session in sessions {
        if session.close().await {
            closed += 1;
        } else {
            tracing::warn!(session_id = %session.id(), "Session engine was already closed");
        }
    }

    tracing::info!(closed, "All sessions closed");
    closed
}
