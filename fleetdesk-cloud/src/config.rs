//! Remote store configuration and layered resolution.
//!
//! Resolution order, first match wins:
//! 1. environment (`FLEETDESK_REMOTE_*`), when the base URL variable is set
//! 2. the config passed explicitly to an engine call
//! 3. the bundled config the engine was built with
//! 4. the config persisted in the local store under [`PERSISTED_CONFIG_KEY`]

use crate::local_store::LocalStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Local store key holding a persisted [`RemoteStoreConfig`] as JSON.
pub const PERSISTED_CONFIG_KEY: &str = "remote_store_config";

pub const ENV_BASE_URL: &str = "FLEETDESK_REMOTE_BASE_URL";
pub const ENV_API_KEY: &str = "FLEETDESK_REMOTE_API_KEY";
pub const ENV_PROJECT_ID: &str = "FLEETDESK_REMOTE_PROJECT_ID";

/// Connection settings for the remote document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStoreConfig {
    /// Base URL of the document API (e.g., "https://docs.fleetdesk.app").
    pub base_url: String,

    /// Public API key sent with the anonymous sign-in.
    #[serde(default)]
    pub api_key: String,

    /// Project the collections live under.
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Collection holding one sync record per local key.
    #[serde(default = "default_sync_collection")]
    pub sync_collection: String,

    /// Collection holding notifications.
    #[serde(default = "default_notification_collection")]
    pub notification_collection: String,
}

fn default_project_id() -> String {
    "default".to_string()
}

fn default_sync_collection() -> String {
    "ops_backup".to_string()
}

fn default_notification_collection() -> String {
    "notifications".to_string()
}

impl RemoteStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: String::new(),
            project_id: default_project_id(),
            sync_collection: default_sync_collection(),
            notification_collection: default_notification_collection(),
        }
    }

    /// Reads the config from `FLEETDESK_REMOTE_*` variables.
    ///
    /// Returns `None` unless the base URL variable is set and non-empty.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(ENV_BASE_URL).ok().filter(|v| !v.trim().is_empty())?;
        let mut config = Self::new(base_url);
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            config.api_key = key;
        }
        if let Ok(project) = std::env::var(ENV_PROJECT_ID) {
            if !project.trim().is_empty() {
                config.project_id = project;
            }
        }
        Some(config)
    }

    /// Reads a persisted config from the local store. Unparseable content is ignored.
    pub fn from_local(store: &dyn LocalStore) -> Option<Self> {
        let raw = store.get(PERSISTED_CONFIG_KEY)?;
        match serde_json::from_str::<Self>(&raw) {
            Ok(config) if !config.base_url.is_empty() => Some(config),
            Ok(_) => None,
            Err(e) => {
                warn!("ignoring unparseable persisted remote config: {e}");
                None
            }
        }
    }

    /// Persists this config into the local store.
    pub fn persist(&self, store: &dyn LocalStore) -> crate::CloudResult<()> {
        store.set(PERSISTED_CONFIG_KEY, &serde_json::to_string(self)?)
    }
}

/// Where a resolved config came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    Environment,
    Explicit,
    Bundled,
    Persisted,
}

/// Resolves the effective remote config following the documented precedence.
pub fn resolve_remote_config(
    explicit: Option<&RemoteStoreConfig>,
    bundled: Option<&RemoteStoreConfig>,
    local: &dyn LocalStore,
) -> Option<(RemoteStoreConfig, ConfigSource)> {
    if let Some(env) = RemoteStoreConfig::from_env() {
        return Some((env, ConfigSource::Environment));
    }
    if let Some(c) = explicit {
        return Some((c.clone(), ConfigSource::Explicit));
    }
    if let Some(c) = bundled {
        return Some((c.clone(), ConfigSource::Bundled));
    }
    RemoteStoreConfig::from_local(local).map(|c| (c, ConfigSource::Persisted))
}

/// Engine tunables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Interval between notification polls.
    pub poll_interval: Duration,

    /// Notifications older than this are pruned.
    pub retention: Duration,

    /// Interval between retention sweeps.
    pub prune_interval: Duration,

    /// Whether new login/system notifications trigger a full restore.
    pub restore_on_activity: bool,

    /// Per-request timeout for the HTTP remote store.
    pub request_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            retention: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            prune_interval: Duration::from_secs(60 * 60),
            restore_on_activity: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}
