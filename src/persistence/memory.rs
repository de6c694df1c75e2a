//! In-memory stores with failure injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::local::LocalStore;
use super::remote::{RemoteDocument, RemoteStore, OWNER_FIELD};
use crate::error::{ClipdeckError, Result};

/// [`LocalStore`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (simulates a full quota).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LocalStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClipdeckError::LocalWriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(key).is_some())
    }
}

/// A merge the remote store accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRecord {
    pub collection: String,
    pub id: String,
    pub fields: Map<String, Value>,
}

/// [`RemoteStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<BTreeMap<(String, String), Map<String, Value>>>,
    merges: Mutex<Vec<MergeRecord>>,
    merge_attempts: AtomicUsize,
    write_delay: Mutex<Option<Duration>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_ordered_queries: AtomicBool,
    fail_unordered_queries: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Point lookups fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// `latest_by_owner` fails, as when the backing index is missing.
    pub fn set_fail_ordered_queries(&self, fail: bool) {
        self.fail_ordered_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_unordered_queries(&self, fail: bool) {
        self.fail_unordered_queries.store(fail, Ordering::SeqCst);
    }

    /// Every merge waits this long before completing.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Seed a document directly.
    pub fn insert_document(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((collection.to_string(), id.to_string()), fields);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    /// Merges attempted, including failed and timed-out ones.
    pub fn merge_attempts(&self) -> usize {
        self.merge_attempts.load(Ordering::SeqCst)
    }

    /// Merges that succeeded, oldest first.
    pub fn merges(&self) -> Vec<MergeRecord> {
        self.merges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_merge(&self) -> Option<MergeRecord> {
        self.merges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn owned_by(&self, collection: &str, owner_id: &str) -> Vec<RemoteDocument> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents
            .iter()
            .filter(|((coll, _), fields)| {
                coll == collection
                    && fields.get(OWNER_FIELD).and_then(Value::as_str) == Some(owner_id)
            })
            .map(|((_, id), fields)| RemoteDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn merge(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        self.merge_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClipdeckError::RemoteWriteFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: "service unavailable".to_string(),
            });
        }

        {
            let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
            let document = documents
                .entry((collection.to_string(), id.to_string()))
                .or_default();
            for (key, value) in &fields {
                document.insert(key.clone(), value.clone());
            }
        }

        self.merges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MergeRecord {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClipdeckError::RemoteReadFailed {
                reason: "service unavailable".to_string(),
            });
        }
        Ok(self.document(collection, id).map(|fields| RemoteDocument {
            id: id.to_string(),
            fields,
        }))
    }

    async fn latest_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Option<RemoteDocument>> {
        if self.fail_ordered_queries.load(Ordering::SeqCst) {
            return Err(ClipdeckError::RemoteQueryFailed {
                reason: "ordered query requires an index".to_string(),
            });
        }
        Ok(super::remote::newest(self.owned_by(collection, owner_id)))
    }

    async fn list_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<RemoteDocument>> {
        if self.fail_unordered_queries.load(Ordering::SeqCst) {
            return Err(ClipdeckError::RemoteQueryFailed {
                reason: "service unavailable".to_string(),
            });
        }
        let mut documents = self.owned_by(collection, owner_id);
        documents.truncate(limit);
        Ok(documents)
    }
}
