//! Session-scoped context shared by the document tracker and transcript.
//!
//! Every activation (new session, selection, replacement after delete)
//! bumps a generation counter. Components capture the [`Ticket`] current at
//! issue time and drop any completion whose ticket is no longer current,
//! which is how a late response for a previous session is discarded.

use tokio::sync::watch;

use crate::types::SessionId;

/// Identity of one activation of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub session_id: SessionId,
    pub generation: u64,
}

/// Holder of the active session.
///
/// Only [`SessionStore`](crate::session::SessionStore) activates sessions;
/// everything else reads.
#[derive(Debug)]
pub struct SessionContext {
    active: watch::Sender<Ticket>,
}

impl SessionContext {
    /// Start with `initial` active at generation 0.
    pub fn new(initial: SessionId) -> Self {
        let (active, _) = watch::channel(Ticket {
            session_id: initial,
            generation: 0,
        });
        Self { active }
    }

    /// Ticket for the current activation.
    pub fn current(&self) -> Ticket {
        self.active.borrow().clone()
    }

    pub fn active_session(&self) -> SessionId {
        self.active.borrow().session_id.clone()
    }

    /// Whether `ticket` still names the current activation.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.active.borrow().generation == ticket.generation
    }

    /// Make `session_id` active under a fresh generation.
    ///
    /// Re-activating the already active id still bumps the generation, so
    /// a reselect invalidates in-flight loads like any other switch.
    pub(crate) fn activate(&self, session_id: SessionId) -> Ticket {
        let mut issued = None;
        self.active.send_modify(|ticket| {
            ticket.generation += 1;
            ticket.session_id = session_id;
            issued = Some(ticket.clone());
        });
        issued.unwrap_or_else(|| self.current())
    }
}
