//! Chat controller.
//!
//! Wires the session store, document tracker and transcript around one
//! shared [`SessionContext`] and exposes the operations a front end calls.
//! A session switch always discards both caches before anything for the
//! new session is loaded.

use std::sync::Arc;
use std::time::Duration;

use documind_common::Config;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::api::{HttpRagApi, RagApi};
use crate::context::{SessionContext, Ticket};
use crate::documents::DocumentTracker;
use crate::error::Result;
use crate::events::{self, ControllerEvent, EventSender};
use crate::notice;
use crate::session::SessionStore;
use crate::transcript::Transcript;
use crate::types::{Document, Message, Session, SessionId, UploadForm};

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Interval between document list refreshes while ingestion runs
    pub poll_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.polling.interval(),
        }
    }
}

/// Result of an upload request.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Neither a URL nor a file was supplied; nothing was sent
    Skipped,
    /// Accepted by the server and listed locally as pending
    Uploaded(Document),
    /// Rejected or failed; the notice was appended to the transcript
    Failed(String),
}

/// Result of a document deletion.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// Rejected or failed; the notice was appended to the transcript
    Failed(String),
}

pub struct ChatController {
    context: Arc<SessionContext>,
    sessions: SessionStore,
    documents: DocumentTracker,
    transcript: Transcript,
    event_tx: EventSender,
}

impl ChatController {
    /// Create a controller with a freshly generated active session.
    ///
    /// A zero poll interval falls back to the default.
    pub fn new(api: Arc<dyn RagApi>, settings: ControllerSettings) -> Self {
        let poll_interval = if settings.poll_interval.is_zero() {
            let fallback = ControllerSettings::default().poll_interval;
            warn!(
                fallback_ms = fallback.as_millis() as u64,
                "Poll interval must be positive, using default"
            );
            fallback
        } else {
            settings.poll_interval
        };
        let context = Arc::new(SessionContext::new(SessionId::new()));
        let event_tx = events::channel();

        Self {
            sessions: SessionStore::new(Arc::clone(&api), Arc::clone(&context), event_tx.clone()),
            documents: DocumentTracker::new(
                Arc::clone(&api),
                Arc::clone(&context),
                poll_interval,
                event_tx.clone(),
            ),
            transcript: Transcript::new(api, Arc::clone(&context), event_tx.clone()),
            context,
            event_tx,
        }
    }

    /// Create a controller talking HTTP to the configured service.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = HttpRagApi::from_config(&config.api)?;
        info!(endpoint = %api.endpoint(), "Using RAG service");
        Ok(Self::new(Arc::new(api), ControllerSettings::from(config)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    pub fn active_session(&self) -> SessionId {
        self.context.active_session()
    }

    /// Fetch the session list and load the active session's data.
    ///
    /// Failures are logged only.
    pub async fn bootstrap(&self) {
        let _ = self.sessions.list_sessions().await;
        let ticket = self.context.current();
        self.load(&ticket).await;
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Start a new, empty session and make it active.
    pub async fn new_session(&self) -> SessionId {
        let ticket = self.sessions.create_session();
        self.clear(&ticket).await;
        ticket.session_id
    }

    /// Switch to `session_id` and load its history and documents.
    pub async fn select_session(&self, session_id: SessionId) {
        let ticket = self.sessions.select_session(session_id);
        self.load(&ticket).await;
    }

    pub async fn refresh_sessions(&self) -> Result<Vec<Session>> {
        self.sessions.list_sessions().await
    }

    /// Known sessions, most recently updated first.
    pub async fn sessions(&self) -> Vec<Session> {
        self.sessions.recent_sessions().await
    }

    /// Delete a session. Deleting the active session activates a new one.
    ///
    /// The session list is refreshed afterwards; a failure there is only
    /// logged.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        if let Some(ticket) = self.sessions.delete_session(session_id).await? {
            self.clear(&ticket).await;
        }
        let _ = self.sessions.list_sessions().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transcript
    // ------------------------------------------------------------------

    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.messages().await
    }

    /// Ask a question in the active session.
    ///
    /// Returns the assistant reply, or `None` when `text` is blank or the
    /// session changed before the turn could start.
    pub async fn send_message(&self, text: &str) -> Option<Message> {
        let ticket = self.context.current();
        self.transcript.send_message(&ticket, text).await
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    pub async fn documents(&self) -> Vec<Document> {
        self.documents.documents().await
    }

    pub async fn refresh_documents(&self) -> Result<Vec<Document>> {
        let ticket = self.context.current();
        self.documents.refresh(&ticket).await
    }

    /// Upload a document to the active session.
    ///
    /// Only a form carrying both a URL and a file is an error; server and
    /// transport failures become a transcript notice.
    pub async fn upload_document(&self, form: UploadForm) -> Result<UploadOutcome> {
        let Some(source) = form.into_source()? else {
            return Ok(UploadOutcome::Skipped);
        };

        let ticket = self.context.current();
        match self.documents.upload(&ticket, source).await {
            Ok(document) => Ok(UploadOutcome::Uploaded(document)),
            Err(e) => {
                warn!(session_id = %ticket.session_id, error = %e, "Upload failed");
                let text = notice::upload_failed(&e);
                self.transcript.append_notice(&ticket, text.clone()).await;
                Ok(UploadOutcome::Failed(text))
            }
        }
    }

    /// Delete a document of the active session.
    ///
    /// Documents still being ingested, or not listed for the session, are
    /// rejected with an error and no request is sent.
    pub async fn delete_document(&self, document_id: &str) -> Result<DeleteOutcome> {
        let ticket = self.context.current();
        match self.documents.delete(&ticket, document_id).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.is_validation() => Err(e),
            Err(e) => {
                warn!(session_id = %ticket.session_id, document_id, error = %e, "Delete failed");
                let text = notice::delete_failed(&e);
                self.transcript.append_notice(&ticket, text.clone()).await;
                Ok(DeleteOutcome::Failed(text))
            }
        }
    }

    /// Whether `session_id` is active and has at least one ready document.
    pub async fn has_ready_document(&self, session_id: &SessionId) -> bool {
        self.documents.has_ready_document(session_id).await
    }

    pub async fn is_polling(&self) -> bool {
        self.documents.is_polling().await
    }

    /// Stop background polling.
    pub async fn shutdown(&self) {
        self.documents.shutdown().await;
    }

    async fn clear(&self, ticket: &Ticket) {
        self.documents.reset(ticket).await;
        self.transcript.reset(ticket).await;
    }

    async fn load(&self, ticket: &Ticket) {
        self.clear(ticket).await;
        let (_, _) = tokio::join!(
            self.transcript.load_history(ticket),
            self.documents.refresh(ticket),
        );
    }
}
