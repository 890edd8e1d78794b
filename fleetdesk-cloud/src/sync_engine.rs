//! Backup sync engine.
//!
//! Pushes changed local keys to the remote store and restores them in the
//! other direction. Every public entry point returns a [`SyncOutcome`]
//! instead of an error; failures are logged and summarized in the message.
//!
//! Per-engine state (the in-flight flag and the last-synced fingerprints)
//! lives in [`SyncState`], so engines never share it.

use crate::api_client::HttpRemoteStore;
use crate::change_bus::{ChangeBus, DataChange};
use crate::config::{resolve_remote_config, ConfigSource, RemoteStoreConfig};
use crate::error::{CloudError, CloudResult};
use crate::keys::sync_candidates;
use crate::local_store::LocalStore;
use crate::remote_store::RemoteStore;
use crate::types::*;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Opens a remote store for a resolved config.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, config: &RemoteStoreConfig) -> CloudResult<Arc<dyn RemoteStore>>;
}

/// Connects over HTTP, reusing the client (and its session) while the config is unchanged.
pub struct HttpConnector {
    timeout: Duration,
    cached: Mutex<Option<(RemoteStoreConfig, Arc<HttpRemoteStore>)>>,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cached: Mutex::new(None),
        }
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, config: &RemoteStoreConfig) -> CloudResult<Arc<dyn RemoteStore>> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| CloudError::Storage("connector lock poisoned".to_string()))?;
        if let Some((cfg, store)) = cached.as_ref() {
            if cfg == config {
                return Ok(store.clone());
            }
        }
        let store = Arc::new(HttpRemoteStore::new(config.clone(), self.timeout)?);
        *cached = Some((config.clone(), store.clone()));
        Ok(store)
    }
}

/// Always hands out the same store, whatever the config says.
pub struct FixedConnector(pub Arc<dyn RemoteStore>);

impl RemoteConnector for FixedConnector {
    fn connect(&self, _config: &RemoteStoreConfig) -> CloudResult<Arc<dyn RemoteStore>> {
        Ok(self.0.clone())
    }
}

/// Mutable state owned by one engine.
#[derive(Default)]
pub struct SyncState {
    in_flight: AtomicBool,
    /// Key -> SHA-256 of the content last pushed or restored. Memory only.
    last_synced: Mutex<HashMap<String, String>>,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn fingerprints(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.last_synced.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True if `content` is what was last synced for `key`.
    pub fn is_current(&self, key: &str, content: &str) -> bool {
        self.fingerprints()
            .get(key)
            .is_some_and(|fp| *fp == fingerprint(content))
    }

    pub fn mark_synced(&self, key: &str, content: &str) {
        self.fingerprints()
            .insert(key.to_string(), fingerprint(content));
    }

    pub fn tracked_keys(&self) -> usize {
        self.fingerprints().len()
    }

    fn touch(&self) {
        *self.last_sync_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync_at.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Push/pull replication between the local store and the backup collection.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    connector: Arc<dyn RemoteConnector>,
    bundled: Option<RemoteStoreConfig>,
    state: SyncState,
    bus: ChangeBus,
}

impl SyncEngine {
    pub fn new(
        local: Arc<dyn LocalStore>,
        connector: Arc<dyn RemoteConnector>,
        bundled: Option<RemoteStoreConfig>,
        bus: ChangeBus,
    ) -> Self {
        Self {
            local,
            connector,
            bundled,
            state: SyncState::new(),
            bus,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// Resolves the effective config, connects, and signs in if needed.
    pub async fn connect(
        &self,
        explicit: Option<&RemoteStoreConfig>,
    ) -> CloudResult<(Arc<dyn RemoteStore>, RemoteStoreConfig)> {
        let (config, source) =
            resolve_remote_config(explicit, self.bundled.as_ref(), self.local.as_ref())
                .ok_or(CloudError::NotConnected)?;
        if source != ConfigSource::Bundled {
            debug!("using {source:?} remote config for {}", config.base_url);
        }

        let remote = self.connector.connect(&config)?;
        if !remote.is_authenticated().await {
            remote.sign_in_anonymously().await?;
        }
        Ok((remote, config))
    }

    /// Pushes every changed, non-empty tracked key to the remote store.
    pub async fn sync_to_cloud(&self, config: Option<&RemoteStoreConfig>) -> SyncOutcome {
        let Some(_guard) = self.state.try_begin() else {
            debug!("sync requested while another is running");
            return SyncOutcome::failed(MSG_SYNC_IN_PROGRESS);
        };

        match self.push(config).await {
            Ok(outcome) => outcome,
            Err(CloudError::NotConnected) => SyncOutcome::failed(MSG_NOT_CONNECTED),
            Err(e) => {
                error!("cloud sync failed: {e}");
                SyncOutcome::failed(format!("Sync failed: {e}"))
            }
        }
    }

    async fn push(&self, config: Option<&RemoteStoreConfig>) -> CloudResult<SyncOutcome> {
        let (remote, config) = self.connect(config).await?;

        let mut pushed: Vec<String> = Vec::new();
        let mut failed = 0usize;

        for key in sync_candidates(self.local.as_ref()) {
            let Some(content) = self.local.get(&key) else {
                continue;
            };
            if content.is_empty() || self.state.is_current(&key, &content) {
                continue;
            }

            let record = serde_json::to_value(SyncRecord::now(content.as_str()))?;
            match remote
                .set_document(&config.sync_collection, &key, record)
                .await
            {
                Ok(()) => {
                    self.state.mark_synced(&key, &content);
                    pushed.push(key);
                }
                Err(e) => {
                    warn!("failed to push {key}: {e}");
                    failed += 1;
                }
            }
        }

        self.state.touch();
        let written = pushed.len();
        if written > 0 {
            info!("pushed {written} keys to {}", config.sync_collection);
            self.bus.publish(DataChange::Pushed { keys: pushed });
        }

        if failed > 0 {
            return Ok(SyncOutcome {
                success: false,
                message: format!("Synced {written} items to cloud, {failed} failed"),
                written,
            });
        }
        Ok(SyncOutcome::ok(format!("Synced {written} items to cloud"), written))
    }

    /// Overwrites local keys with every document in the backup collection.
    pub async fn restore_from_cloud(&self, config: Option<&RemoteStoreConfig>) -> SyncOutcome {
        let Some(_guard) = self.state.try_begin() else {
            debug!("restore requested while a sync is running");
            return SyncOutcome::failed(MSG_SYNC_IN_PROGRESS);
        };

        match self.pull(config).await {
            Ok(outcome) => outcome,
            Err(CloudError::NotConnected) => SyncOutcome::failed(MSG_NOT_CONNECTED),
            Err(e) => {
                error!("cloud restore failed: {e}");
                SyncOutcome::failed(format!("Restore failed: {e}"))
            }
        }
    }

    async fn pull(&self, config: Option<&RemoteStoreConfig>) -> CloudResult<SyncOutcome> {
        let (remote, config) = self.connect(config).await?;
        let documents = remote.get_all_documents(&config.sync_collection).await?;

        if documents.is_empty() {
            info!("restore found no documents in {}", config.sync_collection);
            return Ok(SyncOutcome::ok("Cloud database is empty", 0));
        }

        let mut restored: Vec<String> = Vec::with_capacity(documents.len());
        for doc in documents {
            let content = record_content(&doc);
            self.local.set(&doc.id, &content)?;
            self.state.mark_synced(&doc.id, &content);
            restored.push(doc.id);
        }

        self.state.touch();
        let count = restored.len();
        info!("restored {count} keys from {}", config.sync_collection);
        self.bus.publish(DataChange::Restored { keys: restored });
        Ok(SyncOutcome::ok(format!("Restore complete: {count} items"), count))
    }

    /// Checks that the remote store is reachable and readable.
    pub async fn test_connection(&self, config: Option<&RemoteStoreConfig>) -> SyncOutcome {
        let result = async {
            let (remote, config) = self.connect(config).await?;
            remote.get_all_documents(&config.sync_collection).await?;
            Ok::<_, CloudError>(config)
        }
        .await;

        match result {
            Ok(config) => SyncOutcome::ok(format!("Connected to {}", config.base_url), 0),
            Err(CloudError::NotConnected) => SyncOutcome::failed(MSG_NOT_CONNECTED),
            Err(e) => {
                warn!("connection test failed: {e}");
                SyncOutcome::failed(format!("Connection failed: {e}"))
            }
        }
    }

    /// Document count and newest update in the backup collection. Zero on any failure.
    pub async fn cloud_stats(&self) -> CloudStats {
        let result = async {
            let (remote, config) = self.connect(None).await?;
            remote.get_all_documents(&config.sync_collection).await
        }
        .await;

        match result {
            Ok(documents) => CloudStats {
                document_count: documents.len(),
                last_updated: documents.iter().filter_map(|d| d.last_updated()).max(),
            },
            Err(e) => {
                debug!("cloud stats unavailable: {e}");
                CloudStats::default()
            }
        }
    }

    pub async fn status(&self) -> CloudSyncStatus {
        let is_authenticated = match self.connect_quietly() {
            Some(remote) => remote.is_authenticated().await,
            None => false,
        };
        CloudSyncStatus {
            is_syncing: self.state.is_syncing(),
            is_authenticated,
            tracked_keys: self.state.tracked_keys(),
            last_sync_at: self.state.last_sync_at(),
        }
    }

    fn connect_quietly(&self) -> Option<Arc<dyn RemoteStore>> {
        let (config, _) =
            resolve_remote_config(None, self.bundled.as_ref(), self.local.as_ref())?;
        self.connector.connect(&config).ok()
    }

    /// Pushes on every [`DataChange::LocalWrite`]. Runs until the task is aborted.
    pub fn spawn_auto_sync(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(DataChange::LocalWrite { key }) => {
                        debug!("local write to {key}, pushing");
                        let outcome = self.sync_to_cloud(None).await;
                        if !outcome.success {
                            debug!("auto sync: {}", outcome.message);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        warn!("auto sync lagged behind by {n} changes");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Extracts stored content from a backup document.
///
/// Documents that are not sync records fall back to the raw body: a JSON
/// string is used as-is, anything else as its serialized text.
fn record_content(doc: &RemoteDocument) -> String {
    if let Some(record) = doc.as_sync_record() {
        return record.content;
    }
    warn!("document {} is not a sync record, restoring raw body", doc.id);
    match &doc.data {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
