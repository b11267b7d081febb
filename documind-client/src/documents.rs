//! Document lifecycle tracker.
//!
//! Caches the active session's documents and polls the server while any of
//! them is still `pending` or `processing`.
//!
//! # Ordering
//!
//! Every list fetch draws a sequence number when it is issued. A response
//! is applied only if its session activation is still current and no newer
//! fetch, optimistic insert, or removal has been applied in the meantime.
//! The list is always replaced whole; statuses are never merged field by
//! field.
//!
//! # Polling
//!
//! Whether a poll task should exist is re-evaluated after every change to
//! the cache ([`Inner::reconcile`]). The task is scoped to one activation
//! and is cancelled when the session changes, when the cache holds no
//! in-flight document, or when the tracker shuts down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::RagApi;
use crate::context::{SessionContext, Ticket};
use crate::error::{ClientError, Result};
use crate::events::{ControllerEvent, EventSender};
use crate::types::{has_in_flight, Document, DocumentStatus, SessionId, UploadSource};

/// Running poll task and the activation it was started for.
struct PollerSlot {
    ticket: Ticket,
    token: CancellationToken,
}

struct DocState {
    ticket: Ticket,
    documents: Vec<Document>,
    /// Sequence number of the last change applied to `documents`
    applied_seq: u64,
    poller: Option<PollerSlot>,
}

struct Inner {
    api: Arc<dyn RagApi>,
    context: Arc<SessionContext>,
    interval: Duration,
    state: RwLock<DocState>,
    seq: AtomicU64,
    shutdown: CancellationToken,
    event_tx: EventSender,
}

/// Per-session document cache with status polling.
pub struct DocumentTracker {
    inner: Arc<Inner>,
}

impl DocumentTracker {
    pub fn new(
        api: Arc<dyn RagApi>,
        context: Arc<SessionContext>,
        interval: Duration,
        event_tx: EventSender,
    ) -> Self {
        let ticket = context.current();
        Self {
            inner: Arc::new(Inner {
                api,
                context,
                interval,
                state: RwLock::new(DocState {
                    ticket,
                    documents: Vec::new(),
                    applied_seq: 0,
                    poller: None,
                }),
                seq: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                event_tx,
            }),
        }
    }

    /// Discard the cache and stop polling for a newly activated session.
    pub async fn reset(&self, ticket: &Ticket) {
        self.inner.reset(ticket).await;
    }

    /// Replace the cache with the server's list for `ticket`'s session.
    pub async fn refresh(&self, ticket: &Ticket) -> Result<Vec<Document>> {
        self.inner.refresh(ticket).await
    }

    /// Upload a document and insert it locally as `pending`.
    pub async fn upload(&self, ticket: &Ticket, source: UploadSource) -> Result<Document> {
        self.inner.upload(ticket, source).await
    }

    /// Delete a cached document that has finished ingestion.
    pub async fn delete(&self, ticket: &Ticket, document_id: &str) -> Result<()> {
        self.inner.delete(ticket, document_id).await
    }

    /// Snapshot of the cached documents.
    pub async fn documents(&self) -> Vec<Document> {
        self.inner.state.read().await.documents.clone()
    }

    /// True iff a cached document of `session_id` is `ready`.
    pub async fn has_ready_document(&self, session_id: &SessionId) -> bool {
        let state = self.inner.state.read().await;
        &state.ticket.session_id == session_id
            && state
                .documents
                .iter()
                .any(|d| d.status == DocumentStatus::Ready)
    }

    pub async fn is_polling(&self) -> bool {
        let state = self.inner.state.read().await;
        state
            .poller
            .as_ref()
            .is_some_and(|slot| !slot.token.is_cancelled())
    }

    /// Stop polling for good.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let mut state = self.inner.state.write().await;
        self.inner.reconcile(&mut state);
    }
}

impl Drop for DocumentTracker {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The cache still belongs to `ticket` and `ticket` is still active.
    fn owns(&self, state: &DocState, ticket: &Ticket) -> bool {
        state.ticket == *ticket && self.context.is_current(ticket)
    }

    async fn reset(self: &Arc<Self>, ticket: &Ticket) {
        let mut state = self.state.write().await;
        if !self.context.is_current(ticket) {
            debug!(session_id = %ticket.session_id, "Skipping reset for superseded session");
            return;
        }

        state.ticket = ticket.clone();
        state.documents.clear();
        state.applied_seq = self.next_seq();
        self.publish(&state);
        self.reconcile(&mut state);
    }

    async fn refresh(self: &Arc<Self>, ticket: &Ticket) -> Result<Vec<Document>> {
        let seq = self.next_seq();

        let documents = match self.api.list_documents(&ticket.session_id).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(session_id = %ticket.session_id, error = %e, "Failed to list documents");
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if !self.owns(&state, ticket) {
            debug!(session_id = %ticket.session_id, "Discarding document list for inactive session");
        } else if seq <= state.applied_seq {
            debug!(seq, applied = state.applied_seq, "Discarding superseded document list");
        } else {
            state.documents = documents.clone();
            state.applied_seq = seq;
            self.publish(&state);
            self.reconcile(&mut state);
        }

        Ok(documents)
    }

    async fn upload(self: &Arc<Self>, ticket: &Ticket, source: UploadSource) -> Result<Document> {
        let response = self.api.upload_document(&ticket.session_id, &source).await?;
        let document = Document::pending(response.document_id, ticket.session_id.clone(), &source);

        info!(
            session_id = %ticket.session_id,
            document_id = %document.id,
            kind = %document.kind,
            "Document accepted for ingestion"
        );

        let mut state = self.state.write().await;
        if self.owns(&state, ticket) {
            if !state.documents.iter().any(|d| d.id == document.id) {
                state.documents.push(document.clone());
            }
            state.applied_seq = self.next_seq();
            self.publish(&state);
            self.reconcile(&mut state);
        }

        Ok(document)
    }

    async fn delete(self: &Arc<Self>, ticket: &Ticket, document_id: &str) -> Result<()> {
        {
            let state = self.state.read().await;
            let document = state
                .documents
                .iter()
                .find(|d| d.id == document_id)
                .filter(|_| self.owns(&state, ticket))
                .ok_or_else(|| ClientError::DocumentNotFound(document_id.to_string()))?;

            if !document.status.is_terminal() {
                return Err(ClientError::DocumentInFlight {
                    id: document.id.clone(),
                    status: document.status,
                });
            }
        }

        self.api
            .delete_document(&ticket.session_id, document_id)
            .await?;

        info!(session_id = %ticket.session_id, document_id, "Deleted document");

        let mut state = self.state.write().await;
        if self.owns(&state, ticket) {
            state.documents.retain(|d| d.id != document_id);
            state.applied_seq = self.next_seq();
            self.publish(&state);
            self.reconcile(&mut state);
        }

        Ok(())
    }

    fn publish(&self, state: &DocState) {
        let _ = self.event_tx.send(ControllerEvent::DocumentsChanged {
            session_id: state.ticket.session_id.clone(),
            documents: state.documents.clone(),
        });
    }

    /// Start or stop the poll task so that it runs iff the cache of the
    /// active session holds an in-flight document.
    fn reconcile(self: &Arc<Self>, state: &mut DocState) {
        let wanted = !self.shutdown.is_cancelled()
            && self.context.is_current(&state.ticket)
            && has_in_flight(&state.documents);

        let running = state.poller.as_ref().is_some_and(|slot| {
            slot.ticket.generation == state.ticket.generation && !slot.token.is_cancelled()
        });

        if (wanted && running) || (!wanted && state.poller.is_none()) {
            return;
        }

        if let Some(slot) = state.poller.take() {
            slot.token.cancel();
            let _ = self.event_tx.send(ControllerEvent::PollingStopped {
                session_id: slot.ticket.session_id.clone(),
            });
            debug!(session_id = %slot.ticket.session_id, "Document polling stopped");
        }

        if wanted {
            let token = self.shutdown.child_token();
            state.poller = Some(PollerSlot {
                ticket: state.ticket.clone(),
                token: token.clone(),
            });
            self.spawn_poller(state.ticket.clone(), token);
            let _ = self.event_tx.send(ControllerEvent::PollingStarted {
                session_id: state.ticket.session_id.clone(),
            });
            debug!(
                session_id = %state.ticket.session_id,
                interval_ms = self.interval.as_millis() as u64,
                "Document polling started"
            );
        }
    }

    fn spawn_poller(self: &Arc<Self>, ticket: Ticket, token: CancellationToken) {
        let inner = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; polls start one interval in.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = inner.refresh(&ticket).await {
                            debug!(session_id = %ticket.session_id, error = %e, "Document poll failed");
                        }
                    }
                }
            }

            debug!(session_id = %ticket.session_id, "Poll task exited");
        });
    }
}
