//! `reqwest` implementation of [`RagApi`].

use std::time::Duration;

use async_trait::async_trait;
use documind_common::ApiConfig;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{MessageRecord, QueryResponse, RagApi, UploadResponse};
use crate::error::{ClientError, Result};
use crate::types::{Document, Session, SessionId, UploadSource};

/// Error body shape used by the service for rejected requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the RAG service.
#[derive(Clone)]
pub struct HttpRagApi {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRagApi {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self::with_client(base_url, client))
    }

    /// Create a client from the `api` configuration section.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        let endpoint = base_url.trim().trim_end_matches('/').to_string();
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Map non-2xx responses to [`ClientError::Server`].
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);

        tracing::debug!(status = status.as_u16(), body = %body, "Request rejected by server");

        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))
    }
}

#[async_trait]
impl RagApi for HttpRagApi {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let response = Self::send(self.client.get(self.url("/chat_sessions"))).await?;
        Self::decode(response).await
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        let url = self.url(&format!("/chat_sessions/{}", session_id));
        let response = Self::send(self.client.delete(url)).await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<MessageRecord>> {
        let url = self.url(&format!("/chat_sessions/{}/messages", session_id));
        let response = Self::send(self.client.get(url)).await?;
        Self::decode(response).await
    }

    async fn query(&self, session_id: &SessionId, input: &str) -> Result<QueryResponse> {
        let request = self
            .client
            .get(self.url("/query"))
            .query(&[("session_id", session_id.as_str()), ("input_message", input)]);
        let response = Self::send(request).await?;
        Self::decode(response).await
    }

    async fn list_documents(&self, session_id: &SessionId) -> Result<Vec<Document>> {
        let request = self
            .client
            .get(self.url("/documents"))
            .query(&[("session_id", session_id.as_str())]);
        let response = Self::send(request).await?;
        Self::decode(response).await
    }

    async fn upload_document(
        &self,
        session_id: &SessionId,
        source: &UploadSource,
    ) -> Result<UploadResponse> {
        let form = Form::new().text("session_id", session_id.to_string());
        let form = match source {
            UploadSource::Url(url) => form.text("url", url.clone()),
            UploadSource::File(file) => {
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone())
                    .mime_str("application/pdf")
                    .map_err(|e| ClientError::Request(e.to_string()))?;
                form.part("file", part)
            }
        };

        tracing::debug!(
            session_id = %session_id,
            kind = %source.kind(),
            name = %source.display_name(),
            "Uploading document"
        );

        let request = self.client.post(self.url("/upload_document")).multipart(form);
        let response = Self::send(request).await?;
        Self::decode(response).await
    }

    async fn delete_document(&self, session_id: &SessionId, document_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/documents/{}", document_id)))
            .query(&[("session_id", session_id.as_str())]);
        let response = Self::send(request).await?;
        Self::check(response).await?;
        Ok(())
    }
}
