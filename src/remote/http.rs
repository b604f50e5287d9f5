//! # HTTP Remote Store
//!
//! Talks JSON to a document-store gateway:
//!
//! | Operation | Request |
//! |---|---|
//! | fetch all | `GET {base}/{collection}?includeDeleted=false` → `{"documents": [...]}` |
//! | batch write | `POST {base}/{collection}/batch` with `{"documents": [...]}` |
//! | fetch one | `GET {base}/{collection}/{id}` → document, `404` when absent |
//! | soft delete | `PATCH {base}/{collection}/{id}` with `{"isDeleted": true, "updatedAt": now}` |
//!
//! Transport errors, timeouts, 408, 429 and 5xx responses map to
//! `RemoteUnavailable`; any other non-success status maps to
//! `RemoteRejected` with the response body as the message.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{FetchFilter, RemoteDocument, RemoteStore};
use crate::shared::config::{ConfigError, SyncConfig};
use crate::shared::error::{Result, SyncError};
use crate::shared::now_ms;

#[derive(Debug, Serialize, Deserialize)]
struct DocumentBatch {
    documents: Vec<RemoteDocument>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tombstone {
    is_deleted: bool,
    updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
    collection: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    /// Build a client from configuration; `remote_url` is required
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let base = config
            .remote_base()
            .ok_or(ConfigError::MissingValue("remote_url"))?;
        let base = Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("{base}: {e}")))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::remote_unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            collection: config.collection.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Same client and credentials, pointed at another collection
    pub fn with_collection(&self, collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..self.clone()
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ConfigError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push(&self.collection);
            for segment in tail {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SyncError::remote_unavailable(format!("Network error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| status.to_string());
        Err(classify(status, body))
    }
}

fn classify(status: StatusCode, body: String) -> SyncError {
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        SyncError::remote_unavailable(format!("{status}: {message}"))
    } else {
        SyncError::remote_rejected(Some(status.as_u16()), message)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch_all(&self, filter: FetchFilter) -> Result<Vec<RemoteDocument>> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("includeDeleted", if filter.include_deleted { "true" } else { "false" });

        let response = self.send(self.client.get(url)).await?;
        let batch: DocumentBatch = response
            .json()
            .await
            .map_err(|e| SyncError::remote_unavailable(format!("malformed listing: {e}")))?;

        tracing::debug!(count = batch.documents.len(), collection = %self.collection, "fetched documents");
        Ok(batch.documents)
    }

    async fn batch_write(&self, documents: Vec<RemoteDocument>) -> Result<()> {
        let count = documents.len();
        let url = self.url(&["batch"])?;
        self.send(self.client.post(url).json(&DocumentBatch { documents }))
            .await?;
        tracing::debug!(count, collection = %self.collection, "batch written");
        Ok(())
    }

    async fn fetch_one(&self, id: &str) -> Result<Option<RemoteDocument>> {
        let url = self.url(&[id])?;
        let document: RemoteDocument = match self.send(self.client.get(url)).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| SyncError::remote_unavailable(format!("malformed document: {e}")))?,
            Err(SyncError::RemoteRejected { status: Some(404), .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok((!document.is_deleted).then_some(document))
    }

    async fn soft_delete(&self, id: &str) -> Result<()> {
        let url = self.url(&[id])?;
        let body = Tombstone {
            is_deleted: true,
            updated_at: now_ms(),
        };
        self.send(self.client.patch(url).json(&body)).await?;
        tracing::debug!(record_id = id, "tombstone written");
        Ok(())
    }
}
