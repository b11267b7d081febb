//! Transcript assembler.
//!
//! Holds the active session's messages. History loads replace the list;
//! interactive turns append a user message, then exactly one assistant
//! message (the answer or a failure notice).
//!
//! Turns and history loads of one activation are serialized through a
//! per-activation lock, so replies land in the order questions were asked
//! and a load cannot wipe turns appended after it started.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::api::RagApi;
use crate::context::{SessionContext, Ticket};
use crate::events::{ControllerEvent, EventSender};
use crate::notice;
use crate::types::Message;

struct State {
    ticket: Ticket,
    messages: Vec<Message>,
    turn_lock: Arc<Mutex<()>>,
}

impl State {
    fn fresh(ticket: Ticket) -> Self {
        Self {
            ticket,
            messages: Vec::new(),
            turn_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub struct Transcript {
    api: Arc<dyn RagApi>,
    context: Arc<SessionContext>,
    state: RwLock<State>,
    event_tx: EventSender,
}

impl Transcript {
    pub fn new(api: Arc<dyn RagApi>, context: Arc<SessionContext>, event_tx: EventSender) -> Self {
        let ticket = context.current();
        Self {
            api,
            context,
            state: RwLock::new(State::fresh(ticket)),
            event_tx,
        }
    }

    /// Drop every message and start an empty transcript for `ticket`.
    pub async fn reset(&self, ticket: &Ticket) {
        let mut state = self.state.write().await;
        if self.context.is_current(ticket) {
            *state = State::fresh(ticket.clone());
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    /// Fetch and normalize the stored messages of `ticket`'s session.
    ///
    /// A failed fetch yields an empty transcript.
    pub async fn load_history(&self, ticket: &Ticket) -> Vec<Message> {
        let Some(turn_lock) = self.turn_lock(ticket).await else {
            return Vec::new();
        };
        let _turn = turn_lock.lock().await;

        let messages = match self.api.list_messages(&ticket.session_id).await {
            Ok(records) => records
                .into_iter()
                .filter_map(|record| record.into_message())
                .collect(),
            Err(e) => {
                warn!(session_id = %ticket.session_id, error = %e, "Failed to load message history");
                Vec::new()
            }
        };

        let mut state = self.state.write().await;
        if self.owns(&state, ticket) {
            state.messages = messages.clone();
        } else {
            debug!(session_id = %ticket.session_id, "Discarding history for inactive session");
        }

        messages
    }

    /// Ask a question in `ticket`'s session.
    ///
    /// Blank input is ignored and `None` returned. Otherwise the user
    /// message is appended before the query is issued, and the assistant
    /// reply (or failure notice) that follows it is returned.
    pub async fn send_message(&self, ticket: &Ticket, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let turn_lock = self.turn_lock(ticket).await?;
        let _turn = turn_lock.lock().await;

        if !self.append(ticket, Message::user(text)).await {
            return None;
        }

        let reply = match self.api.query(&ticket.session_id, text).await {
            Ok(response) => response.into_message(),
            Err(e) => {
                warn!(session_id = %ticket.session_id, error = %e, "Query failed");
                Message::ai(notice::SEND_FAILED, Vec::new())
            }
        };

        self.append(ticket, reply.clone()).await;
        Some(reply)
    }

    /// Append an assistant-style notice describing a failed user action.
    pub async fn append_notice(&self, ticket: &Ticket, text: impl Into<String>) -> bool {
        self.append(ticket, Message::ai(text, Vec::new())).await
    }

    async fn append(&self, ticket: &Ticket, message: Message) -> bool {
        let mut state = self.state.write().await;
        if !self.owns(&state, ticket) {
            debug!(session_id = %ticket.session_id, "Dropping message for inactive session");
            return false;
        }

        state.messages.push(message.clone());
        let _ = self.event_tx.send(ControllerEvent::MessageAppended {
            session_id: ticket.session_id.clone(),
            message,
        });
        true
    }

    async fn turn_lock(&self, ticket: &Ticket) -> Option<Arc<Mutex<()>>> {
        let state = self.state.read().await;
        if self.owns(&state, ticket) {
            Some(Arc::clone(&state.turn_lock))
        } else {
            debug!(session_id = %ticket.session_id, "Ignoring request for inactive session");
            None
        }
    }

    fn owns(&self, state: &State, ticket: &Ticket) -> bool {
        state.ticket == *ticket && self.context.is_current(ticket)
    }
}
