//! Query/Upload gateway.
//!
//! Stateless request/response calls against the RAG service. The controller
//! depends on the [`RagApi`] trait only, so tests can substitute an
//! in-memory implementation for [`HttpRagApi`].

mod http;

pub use http::HttpRagApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Document, Message, Sender, Session, SessionId, Source, UploadSource};

/// Remote RAG service operations.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// `GET /chat_sessions`
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// `DELETE /chat_sessions/{id}`
    async fn delete_session(&self, session_id: &SessionId) -> Result<()>;

    /// `GET /chat_sessions/{id}/messages`
    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<MessageRecord>>;

    /// `GET /query?session_id=..&input_message=..`
    async fn query(&self, session_id: &SessionId, input: &str) -> Result<QueryResponse>;

    /// `GET /documents?session_id=..`
    async fn list_documents(&self, session_id: &SessionId) -> Result<Vec<Document>>;

    /// `POST /upload_document`
    async fn upload_document(
        &self,
        session_id: &SessionId,
        source: &UploadSource,
    ) -> Result<UploadResponse>;

    /// `DELETE /documents/{id}?session_id=..`
    async fn delete_document(&self, session_id: &SessionId, document_id: &str) -> Result<()>;
}

/// Stored chat message as returned by the history endpoint.
///
/// The server also sends `id`, `session_id` and `timestamp`; they are not
/// needed to rebuild a transcript and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sources: Option<serde_json::Value>,
}

impl MessageRecord {
    /// Normalize into a transcript [`Message`].
    ///
    /// Returns `None` for unrecognised senders. Sources are kept only on
    /// assistant messages and only when they decode as a list.
    pub fn into_message(self) -> Option<Message> {
        let Some(sender) = Sender::parse(&self.sender) else {
            tracing::debug!(sender = %self.sender, "Dropping message with unknown sender");
            return None;
        };

        let sources = match sender {
            Sender::Ai => Source::list_from_value(self.sources),
            Sender::User => Vec::new(),
        };

        Some(Message {
            sender,
            text: self.text,
            sources,
        })
    }
}

/// Answer returned by the query endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub sources: Option<serde_json::Value>,
}

impl QueryResponse {
    /// Assistant message for this answer, with malformed sources dropped.
    pub fn into_message(self) -> Message {
        Message::ai(self.response, Source::list_from_value(self.sources))
    }
}

/// Acknowledgement of an accepted upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> MessageRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_history_record_normalization() {
        let ai = record(json!({
            "id": "m2",
            "session_id": "s1",
            "sender": "ai",
            "text": "30 days",
            "sources": [{
                "document_id": "d1",
                "chunk_index": 2,
                "score": 0.87,
                "content_excerpt": "Refunds are accepted within 30 days."
            }],
            "timestamp": "2024-05-01T10:00:00"
        }))
        .into_message()
        .unwrap();

        assert_eq!(ai.sender, Sender::Ai);
        assert_eq!(ai.sources.len(), 1);
        assert_eq!(ai.sources[0].chunk_index, 2);
    }

    #[test]
    fn test_user_record_drops_sources() {
        let user = record(json!({
            "sender": "user",
            "text": "hi",
            "sources": [{"document_id": "d1", "chunk_index": 0, "score": 0.1, "content_excerpt": ""}]
        }))
        .into_message()
        .unwrap();
        assert!(user.sources.is_empty());
    }

    #[test]
    fn test_null_or_object_sources_become_empty() {
        let null_sources = record(json!({"sender": "ai", "text": "a", "sources": null}));
        assert!(null_sources.into_message().unwrap().sources.is_empty());

        let object_sources = record(json!({"sender": "ai", "text": "a", "sources": {"d1": 1}}));
        assert!(object_sources.into_message().unwrap().sources.is_empty());
    }

    #[test]
    fn test_unknown_sender_dropped() {
        let system = record(json!({"sender": "system", "text": "boot"}));
        assert!(system.into_message().is_none());
    }

    #[test]
    fn test_query_response_defaults() {
        let response: QueryResponse = serde_json::from_value(json!({})).unwrap();
        let message = response.into_message();
        assert_eq!(message.sender, Sender::Ai);
        assert_eq!(message.text, "");
        assert!(message.sources.is_empty());
    }
}
