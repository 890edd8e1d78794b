//! Port to the remote document store.
//!
//! The store is a set of named collections of JSON documents with
//! get-all/set/update/delete operations and an anonymous sign-in.

use crate::error::{CloudError, CloudResult};
use crate::types::RemoteDocument;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Establishes an anonymous session. Idempotent.
    async fn sign_in_anonymously(&self) -> CloudResult<()>;

    async fn is_authenticated(&self) -> bool;

    /// Returns every document in the collection.
    async fn get_all_documents(&self, collection: &str) -> CloudResult<Vec<RemoteDocument>>;

    /// Creates or fully replaces a document.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> CloudResult<()>;

    /// Merges the top-level fields of `patch` into an existing document.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> CloudResult<()>;

    async fn delete_document(&self, collection: &str, id: &str) -> CloudResult<()>;

    /// Stores raw bytes and returns their public URL.
    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> CloudResult<String>;
}

/// Merges top-level fields of `patch` into `target`. Non-object values replace wholesale.
pub fn merge_patch(target: &mut serde_json::Value, patch: serde_json::Value) {
    match patch {
        serde_json::Value::Object(fields) if target.is_object() => {
            if let Some(obj) = target.as_object_mut() {
                obj.extend(fields);
            }
        }
        other => *target = other,
    }
}

#[derive(Default)]
struct MemoryState {
    authenticated: bool,
    collections: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    blobs: BTreeMap<String, Vec<u8>>,
    writes: usize,
}

/// In-process remote store for offline mode and tests.
///
/// Documents come back in id order. [`MemoryRemoteStore::fail_writes_for`]
/// makes writes to matching ids fail, for exercising partial failure.
#[derive(Default)]
pub struct MemoryRemoteStore {
    state: RwLock<MemoryState>,
    failing_ids: RwLock<Vec<String>>,
    offline: RwLock<bool>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful set/update calls so far.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    pub async fn document(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    pub async fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().await.blobs.get(path).cloned()
    }

    /// Makes every write to a document with this id fail.
    pub async fn fail_writes_for(&self, id: &str) {
        self.failing_ids.write().await.push(id.to_string());
    }

    /// Makes every call fail as if the network were down.
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.write().await = offline;
    }

    async fn check_online(&self) -> CloudResult<()> {
        if *self.offline.read().await {
            return Err(CloudError::Api("remote store unreachable".to_string()));
        }
        Ok(())
    }

    async fn check_writable(&self, id: &str) -> CloudResult<()> {
        self.check_online().await?;
        if self.failing_ids.read().await.iter().any(|f| f == id) {
            return Err(CloudError::Api(format!("permission denied for {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn sign_in_anonymously(&self) -> CloudResult<()> {
        self.check_online().await?;
        self.state.write().await.authenticated = true;
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    async fn get_all_documents(&self, collection: &str) -> CloudResult<Vec<RemoteDocument>> {
        self.check_online().await?;
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| RemoteDocument::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> CloudResult<()> {
        self.check_writable(id).await?;
        let mut state = self.state.write().await;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        state.writes += 1;
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> CloudResult<()> {
        self.check_writable(id).await?;
        let mut state = self.state.write().await;
        let doc = state
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| CloudError::NotFound(format!("{collection}/{id}")))?;
        merge_patch(doc, patch);
        state.writes += 1;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> CloudResult<()> {
        self.check_writable(id).await?;
        let mut state = self.state.write().await;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> CloudResult<String> {
        self.check_writable(path).await?;
        self.state.write().await.blobs.insert(path.to_string(), bytes);
        Ok(format!("memory://blobs/{path}"))
    }
}
