//! Session store.
//!
//! Owns the active session (through [`SessionContext`]) and the last
//! successfully fetched session list.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::RagApi;
use crate::context::{SessionContext, Ticket};
use crate::error::Result;
use crate::events::{ControllerEvent, EventSender};
use crate::types::{sort_by_recency, Session, SessionId};

pub struct SessionStore {
    api: Arc<dyn RagApi>,
    context: Arc<SessionContext>,
    sessions: RwLock<Vec<Session>>,
    event_tx: EventSender,
}

impl SessionStore {
    pub fn new(api: Arc<dyn RagApi>, context: Arc<SessionContext>, event_tx: EventSender) -> Self {
        Self {
            api,
            context,
            sessions: RwLock::new(Vec::new()),
            event_tx,
        }
    }

    pub fn active_session(&self) -> SessionId {
        self.context.active_session()
    }

    /// Generate a new session id and make it active.
    ///
    /// The server learns about the session lazily, once a message or a
    /// document references it.
    pub fn create_session(&self) -> Ticket {
        let ticket = self.context.activate(SessionId::new());
        info!(session_id = %ticket.session_id, "Created session");
        self.announce(&ticket);
        ticket
    }

    /// Make `session_id` active.
    pub fn select_session(&self, session_id: SessionId) -> Ticket {
        let ticket = self.context.activate(session_id);
        info!(session_id = %ticket.session_id, "Selected session");
        self.announce(&ticket);
        ticket
    }

    /// Fetch all sessions from the server.
    ///
    /// The cached list is replaced only on success; a failed listing is
    /// logged and the previous list stays.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        match self.api.list_sessions().await {
            Ok(sessions) => {
                *self.sessions.write().await = sessions.clone();
                let _ = self.event_tx.send(ControllerEvent::SessionsRefreshed {
                    count: sessions.len(),
                });
                Ok(sessions)
            }
            Err(e) => {
                warn!(error = %e, "Failed to list sessions");
                Err(e)
            }
        }
    }

    /// Last fetched sessions, most recently updated first.
    pub async fn recent_sessions(&self) -> Vec<Session> {
        let mut sessions = self.sessions.read().await.clone();
        sort_by_recency(&mut sessions);
        sessions
    }

    /// Delete a session on the server.
    ///
    /// On success the session leaves the cached list, and if it was active a
    /// fresh session replaces it; the returned ticket is that replacement.
    /// On failure nothing changes.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<Option<Ticket>> {
        if let Err(e) = self.api.delete_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to delete session");
            return Err(e);
        }

        self.sessions.write().await.retain(|s| &s.id != session_id);
        info!(session_id = %session_id, "Deleted session");

        if &self.context.active_session() == session_id {
            return Ok(Some(self.create_session()));
        }
        Ok(None)
    }

    fn announce(&self, ticket: &Ticket) {
        let _ = self.event_tx.send(ControllerEvent::SessionActivated {
            session_id: ticket.session_id.clone(),
        });
    }
}
