//! Audible alert on new unread notifications.
//!
//! A cue plays when the unread count rises above the last count a cue was
//! played for. The threshold is persisted so it survives restarts, and it
//! follows the count down when notifications are read.

use fleetdesk_cloud::{CloudResult, LocalStore};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, warn};

/// Local store key holding the last alerted unread count.
pub const ALERT_COUNT_KEY: &str = "notification_alert_count";

/// Playback was refused. Always a soft failure.
#[derive(Debug, Error)]
#[error("alert playback blocked: {0}")]
pub struct PlaybackBlocked(pub String);

/// Plays the alert cue.
pub trait AlertSink: Send + Sync {
    fn play(&self) -> Result<(), PlaybackBlocked>;
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl AlertSink for SilentSink {
    fn play(&self) -> Result<(), PlaybackBlocked> {
        Ok(())
    }
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellSink;

impl AlertSink for BellSink {
    fn play(&self) -> Result<(), PlaybackBlocked> {
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| PlaybackBlocked(e.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AlertTracker {
    last_alerted: usize,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the persisted threshold. Unparseable values count as zero.
    pub fn load(store: &dyn LocalStore) -> Self {
        let last_alerted = store
            .get(ALERT_COUNT_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);
        Self { last_alerted }
    }

    pub fn persist(&self, store: &dyn LocalStore) -> CloudResult<()> {
        store.set(ALERT_COUNT_KEY, &self.last_alerted.to_string())
    }

    pub fn last_alerted(&self) -> usize {
        self.last_alerted
    }

    /// Records the current unread count. Returns true if a cue should play.
    pub fn observe(&mut self, unread: usize) -> bool {
        if unread > self.last_alerted {
            self.last_alerted = unread;
            return true;
        }
        self.last_alerted = unread;
        false
    }
}

/// Plays the cue through `sink`, logging instead of failing when playback is blocked.
pub fn play_soft(sink: &dyn AlertSink) -> bool {
    match sink.play() {
        Ok(()) => {
            debug!("played notification alert");
            true
        }
        Err(e) => {
            warn!("{e}");
            false
        }
    }
}
