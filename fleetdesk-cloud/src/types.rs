//! Shared types for cloud sync operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document as stored in the remote collection.
///
/// `data` is the document body: a JSON object whose shape depends on the
/// collection ([`SyncRecord`] for backups, notifications for the
/// notification collection).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self { id: id.into(), data }
    }

    /// Decodes the body as a sync record, if it has that shape.
    pub fn as_sync_record(&self) -> Option<SyncRecord> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// The body's own `lastUpdated` stamp. `None` if it is missing or unparseable.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.data
            .get("lastUpdated")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Body of one backed-up local key. The document id is the key itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Opaque serialized value of the local key.
    pub content: String,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl SyncRecord {
    pub fn now(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            last_updated: Utc::now(),
        }
    }
}

/// Message of an outcome refused because another sync or restore was running.
pub const MSG_SYNC_IN_PROGRESS: &str = "Sync in progress";

/// Message of an outcome refused because no remote config resolved.
pub const MSG_NOT_CONNECTED: &str = "Not Connected";

/// Result of a user-facing sync entry point. Never an error: callers check `success`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    /// Keys written remotely (push) or locally (restore).
    pub written: usize,
}

impl SyncOutcome {
    pub fn ok(message: impl Into<String>, written: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            written,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            written: 0,
        }
    }

    /// True if nothing was attempted because another run held the engine.
    pub fn is_busy(&self) -> bool {
        !self.success && self.message == MSG_SYNC_IN_PROGRESS
    }
}

/// Summary of the backup collection, shown on the settings screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudStats {
    pub document_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Cloud sync status reported to the UI.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CloudSyncStatus {
    pub is_syncing: bool,
    pub is_authenticated: bool,
    pub tracked_keys: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
}
