//! # Remote Document Store
//!
//! The contract the sync core consumes from the remote side, plus the
//! document shape exchanged with it.
//!
//! ## Document Layout
//!
//! A remote document is the record payload flattened together with the
//! envelope fields:
//!
//! ```json
//! { "id": "p1", "createdAt": 1, "updatedAt": 2, "isDeleted": false, "name": "Algebra", ... }
//! ```
//!
//! `syncStatus` and `lastSyncedAt` are local concerns and are never sent.
//! Deletion is a tombstone (`isDeleted = true`); the remote store never
//! forgets a document.
//!
//! ## Implementations
//!
//! - [`MemoryRemote`] - in-process store with failure injection, for tests
//! - [`HttpRemote`] - JSON over HTTP via `reqwest`
//!
//! One handle serves one collection. Study plans use the configured
//! collection; schedules and progress live in [`SCHEDULES_COLLECTION`] and
//! [`PROGRESS_COLLECTION`].

pub mod http;
pub mod memory;

pub use http::HttpRemote;
pub use memory::{MemoryRemote, RemoteFailure, RemoteOp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::local::record::{Payload, Record};
use crate::shared::error::{Result, SyncError};

/// Remote collection of study schedules
pub const SCHEDULES_COLLECTION: &str = "study_schedules";

/// Remote collection of progress documents, one per `<user>__<schedule>`
pub const PROGRESS_COLLECTION: &str = "user_progress";

/// Keys owned by the envelope; never part of a decoded payload
const ENVELOPE_KEYS: [&str; 6] = ["id", "createdAt", "updatedAt", "isDeleted", "syncStatus", "lastSyncedAt"];

/// One document as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub is_deleted: bool,
    /// Payload fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    /// Build the outgoing document for a record, stamping `updatedAt`.
    ///
    /// The payload must serialize to a JSON object.
    pub fn from_record<P: Payload>(record: &Record<P>, updated_at: i64) -> Result<Self> {
        let mut fields = match serde_json::to_value(&record.payload)? {
            Value::Object(map) => map,
            other => {
                return Err(SyncError::validation(
                    "payload",
                    format!("record '{}' payload must be an object, got {}", record.id, json_kind(&other)),
                ))
            }
        };
        for key in ENVELOPE_KEYS {
            fields.remove(key);
        }
        Ok(Self {
            id: record.id.clone(),
            created_at: record.created_at,
            updated_at,
            is_deleted: false,
            fields,
        })
    }

    /// Wrap a whole JSON object as a document, keeping every field
    pub fn from_value(id: impl Into<String>, created_at: i64, updated_at: i64, value: Value) -> Result<Self> {
        let id = id.into();
        let Value::Object(mut fields) = value else {
            return Err(SyncError::validation("document", format!("'{id}' must be a JSON object")));
        };
        for key in ["id", "createdAt", "updatedAt", "isDeleted"] {
            fields.remove(key);
        }
        Ok(Self {
            id,
            created_at,
            updated_at,
            is_deleted: false,
            fields,
        })
    }

    /// Decode a type whose own fields include `id`, `createdAt` and `updatedAt`
    pub fn decode_with_envelope<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        fields.insert("createdAt".to_string(), Value::from(self.created_at));
        fields.insert("updatedAt".to_string(), Value::from(self.updated_at));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Decode the payload, ignoring envelope fields
    pub fn to_payload<P: Payload>(&self) -> Result<P> {
        let mut fields = self.fields.clone();
        for key in ENVELOPE_KEYS {
            fields.remove(key);
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFilter {
    /// Include tombstoned documents; normal listing leaves this off
    pub include_deleted: bool,
}

impl FetchFilter {
    /// Live documents only
    pub fn live() -> Self {
        Self::default()
    }
}

/// Remote document store consumed by the sync core
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Fetch every document matching `filter`
    async fn fetch_all(&self, filter: FetchFilter) -> Result<Vec<RemoteDocument>>;

    /// Write all documents atomically; either every document is stored or none
    async fn batch_write(&self, documents: Vec<RemoteDocument>) -> Result<()>;

    /// Mark a document deleted
    async fn soft_delete(&self, id: &str) -> Result<()>;

    /// Fetch one live document; absent and tombstoned documents are `None`
    async fn fetch_one(&self, id: &str) -> Result<Option<RemoteDocument>> {
        Ok(self
            .fetch_all(FetchFilter::live())
            .await?
            .into_iter()
            .find(|doc| doc.id == id))
    }
}
