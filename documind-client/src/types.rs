//! Domain types shared by the controller components.
//!
//! These mirror the JSON shapes returned by the RAG service. Sessions and
//! documents are read back from the server; messages are normalized from
//! server records or created locally for new turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sessions
// ============================================================================

/// Opaque chat session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier. Never contacts the server.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters followed by `...`, used as a list label.
    pub fn short(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A chat session as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// Sort sessions most recently active first.
pub fn sort_by_recency(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

// ============================================================================
// Documents
// ============================================================================

/// How a document was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Url,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Url => write!(f, "url"),
        }
    }
}

/// Server-side ingestion status.
///
/// `Pending -> Processing -> Ready | Failed`. Only the server moves a
/// document between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    /// Returns true if no further polling is needed for this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A document attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub session_id: SessionId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    /// Source URL for `url` documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Server-side storage path for uploaded files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Local placeholder inserted right after a successful upload, before
    /// the first poll reports the server's view.
    pub fn pending(id: impl Into<String>, session_id: SessionId, source: &UploadSource) -> Self {
        let now = Utc::now();
        let (kind, url) = match source {
            UploadSource::Url(url) => (DocumentKind::Url, Some(url.clone())),
            UploadSource::File(_) => (DocumentKind::Pdf, None),
        };
        Self {
            id: id.into(),
            session_id,
            name: source.display_name().to_string(),
            kind,
            status: DocumentStatus::Pending,
            url,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// True while at least one document still needs polling.
pub fn has_in_flight(documents: &[Document]) -> bool {
    documents.iter().any(|d| !d.status.is_terminal())
}

// ============================================================================
// Uploads
// ============================================================================

/// A local file to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping its file name.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self { name, bytes })
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Exactly one upload input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Url(String),
    File(FileUpload),
}

impl UploadSource {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Url(_) => DocumentKind::Url,
            Self::File(_) => DocumentKind::Pdf,
        }
    }

    /// Name the document is listed under until the server reports it.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::File(file) => &file.name,
        }
    }
}

/// The two mutually exclusive upload inputs as a front end collects them.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub url: Option<String>,
    pub file: Option<FileUpload>,
}

impl UploadForm {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            file: None,
        }
    }

    pub fn file(file: FileUpload) -> Self {
        Self {
            url: None,
            file: Some(file),
        }
    }

    /// Resolve to a single source.
    ///
    /// `Ok(None)` when nothing was supplied (a whitespace-only URL counts as
    /// nothing); an error when both were supplied.
    pub fn into_source(self) -> Result<Option<UploadSource>, crate::ClientError> {
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        match (url, self.file) {
            (None, None) => Ok(None),
            (Some(_), Some(_)) => Err(crate::ClientError::ConflictingUploadSource),
            (Some(url), None) => Ok(Some(UploadSource::Url(url))),
            (None, Some(file)) => Ok(Some(UploadSource::File(file))),
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// Citation backing part of an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub document_id: String,
    pub chunk_index: u64,
    pub score: f64,
    pub content_excerpt: String,
}

impl Source {
    /// Similarity score as a percentage with one decimal, e.g. `87.0%`.
    pub fn score_percent(&self) -> String {
        format!("{:.1}%", self.score * 100.0)
    }

    /// Lenient decoding of a `sources` field: anything other than a
    /// well-formed array of sources yields an empty list.
    pub fn list_from_value(value: Option<serde_json::Value>) -> Vec<Source> {
        match value {
            Some(v @ serde_json::Value::Array(_)) => {
                serde_json::from_value(v).unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "Discarding malformed sources");
                    Vec::new()
                })
            }
            _ => Vec::new(),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn ai(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            sources,
        }
    }

    /// Whether a front end should render a sources panel.
    pub fn has_sources(&self) -> bool {
        self.sender == Sender::Ai && !self.sources.is_empty()
    }
}

// ============================================================================
// Timestamps
// ============================================================================

pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Parse RFC 3339 or an offset-less ISO-8601 timestamp (read as UTC).
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
