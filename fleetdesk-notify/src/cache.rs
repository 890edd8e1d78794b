//! Local notification cache.
//!
//! Entries are unique by id and kept newest first. Remote fetches are merged
//! in; entries that disappear remotely are kept.

use crate::retention::RetentionPolicy;
use crate::types::Notification;
use chrono::{DateTime, Utc};
use fleetdesk_cloud::{CloudResult, LocalStore};
use std::collections::HashSet;
use tracing::warn;

/// Local store key holding the cache as a JSON array.
pub const CACHE_KEY: &str = "notification_cache";

/// What a merge changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids seen for the first time, in fetch order.
    pub new_ids: Vec<String>,
    /// Existing entries whose read flag changed.
    pub updated: usize,
    /// A new login or system notification arrived.
    pub activity_detected: bool,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.new_ids.is_empty() && self.updated == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationCache {
    entries: Vec<Notification>,
}

impl NotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cache from arbitrary entries, dropping duplicate ids and sorting.
    pub fn from_entries(entries: Vec<Notification>) -> Self {
        let mut cache = Self { entries };
        cache.normalize();
        cache
    }

    /// Loads the cache from the local store. Missing or corrupt content gives an empty cache.
    pub fn load(store: &dyn LocalStore) -> Self {
        let Some(raw) = store.get(CACHE_KEY) else {
            return Self::new();
        };
        match serde_json::from_str::<Vec<Notification>>(&raw) {
            Ok(entries) => Self::from_entries(entries),
            Err(e) => {
                warn!("discarding unreadable notification cache: {e}");
                Self::new()
            }
        }
    }

    pub fn persist(&self, store: &dyn LocalStore) -> CloudResult<()> {
        store.set(CACHE_KEY, &serde_json::to_string(&self.entries)?)
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Always recomputed from the entries.
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    /// Merges a remote fetch into the cache.
    ///
    /// New ids are inserted unread, with `now` as timestamp if they have none.
    /// Known ids take the remote read flag. Everything else is left alone.
    pub fn merge(&mut self, fetched: Vec<Notification>, now: DateTime<Utc>) -> MergeReport {
        let mut report = MergeReport::default();

        for mut incoming in fetched {
            if incoming.id.is_empty() {
                warn!("skipping notification without id: {}", incoming.title);
                continue;
            }

            match self.entries.iter().position(|e| e.id == incoming.id) {
                Some(idx) => {
                    let existing = &mut self.entries[idx];
                    if existing.read != incoming.read {
                        existing.read = incoming.read;
                        report.updated += 1;
                    }
                }
                None => {
                    incoming.read = false;
                    incoming.timestamp.get_or_insert(now);
                    report.activity_detected |= incoming.kind.signals_activity();
                    report.new_ids.push(incoming.id.clone());
                    self.entries.push(incoming);
                }
            }
        }

        self.normalize();
        report
    }

    /// Marks one entry read. Returns false if it was unknown or already read.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.read => {
                n.read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every entry read and returns the ids that changed.
    pub fn mark_all_read(&mut self) -> Vec<String> {
        self.entries
            .iter_mut()
            .filter(|n| !n.read)
            .map(|n| {
                n.read = true;
                n.id.clone()
            })
            .collect()
    }

    /// Removes entries the policy considers expired and returns them.
    pub fn prune(&mut self, policy: &RetentionPolicy, now: DateTime<Utc>) -> Vec<Notification> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|n| policy.is_expired(n, now));
        self.entries = kept;
        expired
    }

    fn normalize(&mut self) {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.retain(|n| seen.insert(n.id.clone()));
        // Stable: equal timestamps keep arrival order.
        self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}
