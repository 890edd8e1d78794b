//! Notification expiry.

use crate::types::Notification;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Notifications older than `max_age` are removed locally and remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
}

impl RetentionPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Entries without a timestamp never expire.
    pub fn is_expired(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        let Some(ts) = notification.timestamp else {
            return false;
        };
        match chrono::Duration::from_std(self.max_age) {
            Ok(max_age) => now - ts > max_age,
            // Larger than chrono can represent: nothing is that old.
            Err(_) => false,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 24 * 60 * 60))
    }
}
