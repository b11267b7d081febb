//! Events published by the controller for front ends.

use tokio::sync::broadcast;

use crate::types::{Document, Message, SessionId};

/// Capacity of the event channel; slow subscribers see `Lagged`.
pub const EVENT_CAPACITY: usize = 100;

/// Events emitted by the controller
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A session became active
    SessionActivated { session_id: SessionId },
    /// The session list was fetched
    SessionsRefreshed { count: usize },
    /// The document cache for the active session was replaced or edited
    DocumentsChanged {
        session_id: SessionId,
        documents: Vec<Document>,
    },
    /// A message was appended to the active transcript
    MessageAppended {
        session_id: SessionId,
        message: Message,
    },
    /// Document status polling started for a session
    PollingStarted { session_id: SessionId },
    /// Document status polling stopped for a session
    PollingStopped { session_id: SessionId },
}

/// Sending half shared by the components.
pub type EventSender = broadcast::Sender<ControllerEvent>;

pub fn channel() -> EventSender {
    let (tx, _) = broadcast::channel(EVENT_CAPACITY);
    tx
}
