//! Restore-on-activity trigger.
//!
//! A new login or system notification means another session may have changed
//! shared data. The trigger pulls the full backup and asks every data view to
//! re-read. Failed restores back off exponentially; triggers that arrive
//! during the backoff window are skipped.

use fleetdesk_cloud::{DataChange, RefreshTopic, SyncEngine, SyncOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_CAP: Duration = Duration::from_secs(300); // 5 min

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshResult {
    /// The trigger is switched off.
    Disabled,
    /// A recent failure is still backing off.
    BackingOff { remaining: Duration },
    /// Another sync or restore was running; nothing was attempted.
    Busy,
    Refreshed(SyncOutcome),
    Failed(SyncOutcome),
}

#[derive(Debug, Default)]
struct Backoff {
    failures: u32,
    retry_after: Option<Instant>,
}

/// Delay after `failures` consecutive failures: 5s, 10s, 20s, ... capped at 5 min.
pub fn backoff_delay(failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
    BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
}

pub struct ActivityRefresh {
    engine: Arc<SyncEngine>,
    enabled: bool,
    backoff: Mutex<Backoff>,
}

impl ActivityRefresh {
    pub fn new(engine: Arc<SyncEngine>, enabled: bool) -> Self {
        Self {
            engine,
            enabled,
            backoff: Mutex::new(Backoff::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn consecutive_failures(&self) -> u32 {
        self.backoff.lock().await.failures
    }

    /// Runs a full restore unless disabled or backing off.
    pub async fn trigger(&self) -> RefreshResult {
        if !self.enabled {
            return RefreshResult::Disabled;
        }

        let mut backoff = self.backoff.lock().await;
        if let Some(at) = backoff.retry_after {
            let now = Instant::now();
            if now < at {
                debug!("activity refresh backing off");
                return RefreshResult::BackingOff {
                    remaining: at - now,
                };
            }
        }

        let outcome = self.engine.restore_from_cloud(None).await;
        if outcome.success {
            backoff.failures = 0;
            backoff.retry_after = None;
            info!("activity refresh: {}", outcome.message);
            let bus = self.engine.bus();
            bus.publish(DataChange::RefreshRequested(RefreshTopic::Storage));
            bus.publish(DataChange::RefreshRequested(RefreshTopic::Attendance));
            return RefreshResult::Refreshed(outcome);
        }

        if outcome.is_busy() {
            return RefreshResult::Busy;
        }

        backoff.failures = backoff.failures.saturating_add(1);
        let delay = backoff_delay(backoff.failures);
        backoff.retry_after = Some(Instant::now() + delay);
        warn!(
            "activity refresh failed ({} in a row), next attempt in {delay:?}: {}",
            backoff.failures, outcome.message
        );
        RefreshResult::Failed(outcome)
    }
}
