//! In-memory RAG service used by the controller tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use documind_client::{
    ClientError, Document, DocumentStatus, MessageRecord, QueryResponse, RagApi, Result, Session,
    SessionId, UploadResponse, UploadSource,
};

/// Mock service that records every call and can be told to fail or stall.
#[derive(Default)]
pub struct FakeApi {
    sessions: Mutex<Vec<Session>>,
    documents: Mutex<HashMap<String, Vec<Document>>>,
    messages: Mutex<HashMap<String, Vec<MessageRecord>>>,
    replies: Mutex<HashMap<String, QueryResponse>>,
    failures: Mutex<HashMap<String, (u16, Option<String>)>>,
    unreachable: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
    next_document: Mutex<u32>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, id: &str) {
        let now = Utc::now();
        self.sessions.lock().unwrap().push(Session {
            id: id.into(),
            created_at: now,
            updated_at: now,
        });
    }

    pub fn add_document(&self, session: &str, id: &str, status: DocumentStatus) {
        let now = Utc::now();
        let document = Document {
            id: id.to_string(),
            session_id: session.into(),
            name: format!("{id}.pdf"),
            kind: documind_client::DocumentKind::Pdf,
            status,
            url: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        };
        self.documents
            .lock()
            .unwrap()
            .entry(session.to_string())
            .or_default()
            .push(document);
    }

    /// Change a stored document's status, as server-side ingestion would.
    pub fn set_status(&self, id: &str, status: DocumentStatus) {
        for documents in self.documents.lock().unwrap().values_mut() {
            for document in documents.iter_mut().filter(|d| d.id == id) {
                document.status = status;
                document.updated_at = Utc::now();
            }
        }
    }

    pub fn add_message(&self, session: &str, record: serde_json::Value) {
        let record: MessageRecord = serde_json::from_value(record).unwrap();
        self.messages
            .lock()
            .unwrap()
            .entry(session.to_string())
            .or_default()
            .push(record);
    }

    pub fn reply(&self, input: &str, response: serde_json::Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(input.to_string(), serde_json::from_value(response).unwrap());
    }

    /// Make calls to `op` answer with a non-2xx status.
    pub fn fail(&self, op: &str, status: u16, message: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .insert(op.to_string(), (status, message.map(String::from)));
    }

    /// Make calls to `op` fail without a response.
    pub fn disconnect(&self, op: &str) {
        self.unreachable.lock().unwrap().insert(op.to_string());
    }

    pub fn heal(&self, op: &str) {
        self.failures.lock().unwrap().remove(op);
        self.unreachable.lock().unwrap().remove(op);
    }

    /// Stall the next call recorded as `key` until the returned sender fires.
    pub fn hold(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn enter(&self, op: &str, key: String) -> Result<()> {
        self.calls.lock().unwrap().push(key.clone());

        let gate = self.gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.unreachable.lock().unwrap().contains(op) {
            return Err(ClientError::Request("connection refused".into()));
        }
        if let Some((status, message)) = self.failures.lock().unwrap().get(op).cloned() {
            return Err(ClientError::Server { status, message });
        }
        Ok(())
    }
}

#[async_trait]
impl RagApi for FakeApi {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.enter("list_sessions", "list_sessions".into()).await?;
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        self.enter("delete_session", format!("delete_session:{session_id}"))
            .await?;
        self.sessions.lock().unwrap().retain(|s| &s.id != session_id);
        self.documents.lock().unwrap().remove(session_id.as_str());
        self.messages.lock().unwrap().remove(session_id.as_str());
        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<MessageRecord>> {
        self.enter("list_messages", format!("list_messages:{session_id}"))
            .await?;
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(session_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn query(&self, _session_id: &SessionId, input: &str) -> Result<QueryResponse> {
        self.enter("query", format!("query:{input}")).await?;
        let reply = self.replies.lock().unwrap().get(input).cloned();
        Ok(reply.unwrap_or_else(|| QueryResponse {
            response: format!("answer to {input}"),
            sources: None,
        }))
    }

    /// Answers with the list as it was when the call arrived, even if the
    /// call is held.
    async fn list_documents(&self, session_id: &SessionId) -> Result<Vec<Document>> {
        let snapshot = self
            .documents
            .lock()
            .unwrap()
            .get(session_id.as_str())
            .cloned()
            .unwrap_or_default();
        self.enter("list_documents", format!("list_documents:{session_id}"))
            .await?;
        Ok(snapshot)
    }

    async fn upload_document(
        &self,
        session_id: &SessionId,
        source: &UploadSource,
    ) -> Result<UploadResponse> {
        self.enter("upload_document", format!("upload_document:{session_id}"))
            .await?;

        let id = {
            let mut next = self.next_document.lock().unwrap();
            *next += 1;
            format!("doc-{}", *next)
        };
        let stored = Document::pending(id.clone(), session_id.clone(), source);
        self.documents
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(stored);

        Ok(UploadResponse { document_id: id })
    }

    async fn delete_document(&self, session_id: &SessionId, document_id: &str) -> Result<()> {
        self.enter("delete_document", format!("delete_document:{document_id}"))
            .await?;
        if let Some(documents) = self.documents.lock().unwrap().get_mut(session_id.as_str()) {
            documents.retain(|d| d.id != document_id);
        }
        Ok(())
    }
}

/// Yield until `fake` has recorded a call starting with `prefix`.
pub async fn wait_for_call(fake: &FakeApi, prefix: &str) {
    for _ in 0..1000 {
        if fake.count(prefix) > 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("no call matching {prefix}: {:?}", fake.calls());
}
