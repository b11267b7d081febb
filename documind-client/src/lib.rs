//! DocuMind Client - session and document lifecycle controller for the
//! DocuMind document Q&A service.
//!
//! This crate provides:
//! - Wire and domain types for sessions, documents, messages and sources
//! - The [`RagApi`] gateway trait and its HTTP implementation
//! - Session store, document lifecycle tracker (with status polling) and
//!   transcript assembler
//! - [`ChatController`], the facade front ends drive

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod api;
pub mod context;
pub mod controller;
pub mod documents;
pub mod error;
pub mod events;
pub mod notice;
pub mod session;
pub mod transcript;
pub mod types;

pub use api::{HttpRagApi, MessageRecord, QueryResponse, RagApi, UploadResponse};
pub use context::{SessionContext, Ticket};
pub use controller::{ChatController, ControllerSettings, DeleteOutcome, UploadOutcome};
pub use error::{ClientError, Result};
pub use events::ControllerEvent;
pub use types::{
    Document, DocumentKind, DocumentStatus, FileUpload, Message, Sender, Session, SessionId,
    Source, UploadForm, UploadSource,
};
