//! Error type for controller and gateway operations.

use thiserror::Error;

use crate::types::DocumentStatus;

/// Error type for DocuMind client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Server returned a non-2xx response
    #[error("Server error: {status} - {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    /// A 2xx response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The client could not be constructed
    #[error("Client configuration error: {0}")]
    Config(String),

    /// Both a URL and a file were supplied for one upload
    #[error("Provide either a URL or a file, not both")]
    ConflictingUploadSource,

    /// Deletion requested while ingestion is still running
    #[error("Document {id} is still {status} and cannot be deleted yet")]
    DocumentInFlight { id: String, status: DocumentStatus },

    /// Deletion requested for a document the active session does not list
    #[error("Document not found in the active session: {0}")]
    DocumentNotFound(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Rejections raised before any request is issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConflictingUploadSource | Self::DocumentInFlight { .. } | Self::DocumentNotFound(_)
        )
    }

    /// Text the server gave for a rejected request, or `HTTP {status}` when
    /// the body carried none. `None` for failures without a response.
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message.clone()),
            Self::Server { status, .. } => Some(format!("HTTP {status}")),
            _ => None,
        }
    }
}
