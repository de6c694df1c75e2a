//! Remote document tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::state::{load_snapshot, Project};

/// Field holding the owning user's id.
pub const OWNER_FIELD: &str = "ownerId";

/// Field holding the RFC 3339 time of the last remote write.
pub const UPDATED_FIELD: &str = "updatedAt";

/// A document as stored remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn owner_id(&self) -> Option<&str> {
        self.fields.get(OWNER_FIELD).and_then(Value::as_str)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(UPDATED_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|time| time.with_timezone(&Utc))
    }

    /// Project fields only, without the sync bookkeeping fields.
    pub fn project_fields(&self) -> Map<String, Value> {
        let mut fields = self.fields.clone();
        fields.remove(OWNER_FIELD);
        fields.remove(UPDATED_FIELD);
        fields
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        fields
    }

    pub fn into_project(self) -> Result<Project> {
        load_snapshot(Value::Object(self.project_fields()))
    }
}

/// Document store keyed by `(collection, id)`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Merge `fields` into the document, creating it if needed. Fields not
    /// mentioned are left as they are.
    async fn merge(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Point lookup.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>>;

    /// The owner's most recently updated document (ordered query).
    async fn latest_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Option<RemoteDocument>>;

    /// Up to `limit` of the owner's documents, in no particular order.
    async fn list_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<RemoteDocument>>;
}

/// The most recently updated document; undated ones sort first.
pub fn newest(documents: Vec<RemoteDocument>) -> Option<RemoteDocument> {
    documents
        .into_iter()
        .max_by(|a, b| a.updated_at().cmp(&b.updated_at()))
}
