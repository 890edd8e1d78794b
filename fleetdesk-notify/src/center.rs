//! Notification reconciler.
//!
//! Owns the local cache for one viewer. Each poll fetches the remote
//! notifications visible to the viewer, merges them, persists the cache,
//! runs the alert policy, and fires the activity refresh when a new login or
//! system notification arrives. Mark-read operations update the cache first
//! and tell the remote store in the background; they are never rolled back.

use crate::alert::{play_soft, AlertSink, AlertTracker};
use crate::cache::{MergeReport, NotificationCache};
use crate::filter::visible_to;
use crate::refresh::{ActivityRefresh, RefreshResult};
use crate::retention::RetentionPolicy;
use crate::types::{Notification, NotificationDraft, Viewer};

use chrono::Utc;
use fleetdesk_cloud::{
    CloudError, CloudResult, CoreConfig, DataChange, LocalStore, RefreshTopic, RemoteDocument,
    SyncEngine,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Where the reconciler is in its poll cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Polling,
    Merging,
    /// The last fetch failed. The next poll starts over.
    Error,
}

/// What one poll did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollReport {
    pub fetched: usize,
    pub merge: MergeReport,
    pub unread: usize,
    pub alerted: bool,
    pub refresh: Option<RefreshResult>,
    /// Set when the fetch failed; nothing else changed.
    pub error: Option<String>,
}

impl PollReport {
    fn failed(unread: usize, error: String) -> Self {
        Self {
            fetched: 0,
            merge: MergeReport::default(),
            unread,
            alerted: false,
            refresh: None,
            error: Some(error),
        }
    }
}

pub struct NotificationCenter {
    engine: Arc<SyncEngine>,
    viewer: Viewer,
    cache: Mutex<NotificationCache>,
    alert: Mutex<AlertTracker>,
    sink: Arc<dyn AlertSink>,
    refresh: ActivityRefresh,
    retention: RetentionPolicy,
    phase: Mutex<PollPhase>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl NotificationCenter {
    /// Creates a reconciler for `viewer`, loading the persisted cache and alert threshold.
    pub fn new(
        engine: Arc<SyncEngine>,
        viewer: Viewer,
        sink: Arc<dyn AlertSink>,
        config: &CoreConfig,
    ) -> Self {
        let local = engine.local().clone();
        let cache = NotificationCache::load(local.as_ref());
        let alert = AlertTracker::load(local.as_ref());
        let refresh = ActivityRefresh::new(engine.clone(), config.restore_on_activity);

        Self {
            engine,
            viewer,
            cache: Mutex::new(cache),
            alert: Mutex::new(alert),
            sink,
            refresh,
            retention: RetentionPolicy::new(config.retention),
            phase: Mutex::new(PollPhase::Idle),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn phase(&self) -> PollPhase {
        *lock(&self.phase)
    }

    fn set_phase(&self, phase: PollPhase) {
        *lock(&self.phase) = phase;
    }

    fn local(&self) -> &dyn LocalStore {
        self.engine.local().as_ref()
    }

    /// Snapshot of the cache, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.cache).entries().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.cache).unread_count()
    }

    pub fn last_alerted(&self) -> usize {
        lock(&self.alert).last_alerted()
    }

    pub fn refresh_trigger(&self) -> &ActivityRefresh {
        &self.refresh
    }

    // ── Fetch ──

    async fn try_fetch(&self) -> CloudResult<Vec<Notification>> {
        let (remote, config) = self.engine.connect(None).await?;
        let documents = remote
            .get_all_documents(&config.notification_collection)
            .await?;
        Ok(visible_to(decode_notifications(documents), &self.viewer))
    }

    /// Remote notifications visible to this viewer. Empty on any failure.
    pub async fn fetch_notifications(&self) -> Vec<Notification> {
        match self.try_fetch().await {
            Ok(list) => list,
            Err(e) => {
                warn!("failed to fetch notifications: {e}");
                Vec::new()
            }
        }
    }

    // ── Poll ──

    /// Runs one fetch/merge/alert cycle.
    pub async fn poll_once(&self) -> PollReport {
        self.set_phase(PollPhase::Polling);

        let fetched = match self.try_fetch().await {
            Ok(list) => list,
            Err(e) => {
                self.set_phase(PollPhase::Error);
                debug!("notification poll failed: {e}");
                return PollReport::failed(self.unread_count(), e.to_string());
            }
        };

        self.set_phase(PollPhase::Merging);
        let fetched_count = fetched.len();
        let now = Utc::now();
        // Expired entries whose remote delete failed must not come back as new.
        let fetched: Vec<Notification> = fetched
            .into_iter()
            .filter(|n| !self.retention.is_expired(n, now))
            .collect();
        let (merge, unread) = {
            let mut cache = lock(&self.cache);
            let merge = cache.merge(fetched, now);
            if !merge.is_noop() {
                if let Err(e) = cache.persist(self.local()) {
                    warn!("failed to persist notification cache: {e}");
                }
            }
            (merge, cache.unread_count())
        };

        if !merge.new_ids.is_empty() {
            self.engine
                .bus()
                .publish(DataChange::RefreshRequested(RefreshTopic::Notifications));
        }

        let alerted = self.observe_unread(unread);

        let refresh = if merge.activity_detected {
            Some(self.refresh.trigger().await)
        } else {
            None
        };

        self.set_phase(PollPhase::Idle);
        PollReport {
            fetched: fetched_count,
            merge,
            unread,
            alerted,
            refresh,
            error: None,
        }
    }

    /// Applies the alert policy to `unread` and plays the cue if it rose.
    fn observe_unread(&self, unread: usize) -> bool {
        let should_play = {
            let mut alert = lock(&self.alert);
            let before = *alert;
            let play = alert.observe(unread);
            if *alert != before {
                if let Err(e) = alert.persist(self.local()) {
                    warn!("failed to persist alert threshold: {e}");
                }
            }
            play
        };
        should_play && play_soft(self.sink.as_ref())
    }

    // ── Mark read ──

    /// Marks one notification read locally and tells the remote store in the background.
    ///
    /// Returns false if the id is unknown or already read. Must run inside a tokio runtime
    /// for the remote update to be sent.
    pub fn mark_notification_as_read(&self, id: &str) -> bool {
        let unread = {
            let mut cache = lock(&self.cache);
            if !cache.mark_read(id) {
                return false;
            }
            if let Err(e) = cache.persist(self.local()) {
                warn!("failed to persist notification cache: {e}");
            }
            cache.unread_count()
        };

        self.observe_unread(unread);
        self.spawn_remote_read(vec![id.to_string()]);
        true
    }

    /// Marks every cached notification read. Returns how many changed.
    pub fn mark_all_notifications_as_read(&self) -> usize {
        let changed = {
            let mut cache = lock(&self.cache);
            let changed = cache.mark_all_read();
            if changed.is_empty() {
                return 0;
            }
            if let Err(e) = cache.persist(self.local()) {
                warn!("failed to persist notification cache: {e}");
            }
            changed
        };

        self.observe_unread(0);
        let count = changed.len();
        self.spawn_remote_read(changed);
        count
    }

    fn spawn_remote_read(&self, ids: Vec<String>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, read state of {} notifications stays local", ids.len());
            return;
        };
        let engine = self.engine.clone();
        runtime.spawn(async move {
            if let Err(e) = push_read_flags(&engine, &ids).await {
                warn!("failed to mark notifications read remotely: {e}");
            }
        });
    }

    // ── Produce ──

    pub async fn send_system_notification(
        &self,
        draft: NotificationDraft,
    ) -> CloudResult<Notification> {
        send_system_notification(&self.engine, draft).await
    }

    // ── Retention ──

    /// Drops expired notifications locally, then deletes them remotely best-effort.
    pub async fn prune_expired(&self) -> usize {
        let (expired, unread) = {
            let mut cache = lock(&self.cache);
            let expired = cache.prune(&self.retention, Utc::now());
            if !expired.is_empty() {
                if let Err(e) = cache.persist(self.local()) {
                    warn!("failed to persist notification cache: {e}");
                }
            }
            (expired, cache.unread_count())
        };
        if expired.is_empty() {
            return 0;
        }
        self.observe_unread(unread);

        match self.engine.connect(None).await {
            Ok((remote, config)) => {
                for n in &expired {
                    if let Err(e) = remote
                        .delete_document(&config.notification_collection, &n.id)
                        .await
                    {
                        debug!("could not delete expired notification {}: {e}", n.id);
                    }
                }
            }
            Err(e) => debug!("skipping remote prune: {e}"),
        }

        debug!("pruned {} expired notifications", expired.len());
        expired.len()
    }
}

/// Decodes notification documents, filling a missing id from the document id.
pub fn decode_notifications(documents: Vec<RemoteDocument>) -> Vec<Notification> {
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<Notification>(doc.data) {
            Ok(mut n) => {
                if n.id.is_empty() {
                    n.id = doc.id;
                }
                Some(n)
            }
            Err(e) => {
                warn!("skipping malformed notification {}: {e}", doc.id);
                None
            }
        })
        .collect()
}

async fn push_read_flags(engine: &SyncEngine, ids: &[String]) -> CloudResult<()> {
    let (remote, config) = engine.connect(None).await?;
    let mut last_err: Option<CloudError> = None;
    for id in ids {
        if let Err(e) = remote
            .update_document(
                &config.notification_collection,
                id,
                serde_json::json!({ "read": true }),
            )
            .await
        {
            warn!("failed to mark {id} read remotely: {e}");
            last_err = Some(e);
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Writes a new notification to the remote collection.
///
/// Assigns a time-ordered id and the current timestamp; the stored
/// notification starts unread.
pub async fn send_system_notification(
    engine: &SyncEngine,
    draft: NotificationDraft,
) -> CloudResult<Notification> {
    let notification = Notification {
        id: uuid::Uuid::now_v7().to_string(),
        kind: draft.kind,
        title: draft.title,
        message: draft.message,
        target_roles: draft.target_roles,
        corporate_id: draft.corporate_id,
        employee_id: draft.employee_id,
        link: draft.link,
        timestamp: Some(Utc::now()),
        read: false,
    };

    let (remote, config) = engine.connect(None).await?;
    remote
        .set_document(
            &config.notification_collection,
            &notification.id,
            serde_json::to_value(&notification)?,
        )
        .await?;
    debug!("sent {} notification {}", notification.kind, notification.id);
    Ok(notification)
}
