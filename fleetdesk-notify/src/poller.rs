//! Background poll loop for the notification reconciler.
//!
//! Polls on a fixed interval, sweeps expired notifications on a slower one,
//! and accepts commands through a [`PollerHandle`].

use crate::center::NotificationCenter;
use fleetdesk_cloud::{CloudError, CloudResult, CoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug)]
enum PollerCommand {
    Stop,
    PollNow,
    PruneNow,
}

/// Handle for sending commands to a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    command_tx: mpsc::Sender<PollerCommand>,
}

impl PollerHandle {
    pub async fn stop(&self) -> CloudResult<()> {
        self.send(PollerCommand::Stop).await
    }

    /// Polls immediately instead of waiting for the next tick.
    pub async fn poll_now(&self) -> CloudResult<()> {
        self.send(PollerCommand::PollNow).await
    }

    pub async fn prune_now(&self) -> CloudResult<()> {
        self.send(PollerCommand::PruneNow).await
    }

    async fn send(&self, cmd: PollerCommand) -> CloudResult<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| CloudError::Api("notification poller not running".to_string()))
    }
}

pub struct NotificationPoller {
    center: Arc<NotificationCenter>,
    command_rx: mpsc::Receiver<PollerCommand>,
    poll_interval: Duration,
    prune_interval: Duration,
}

/// Creates a poller for `center` and its command handle.
pub fn create_notification_poller(
    center: Arc<NotificationCenter>,
    config: &CoreConfig,
) -> (PollerHandle, NotificationPoller) {
    let (command_tx, command_rx) = mpsc::channel(16);

    let poller = NotificationPoller {
        center,
        command_rx,
        poll_interval: config.poll_interval,
        prune_interval: config.prune_interval,
    };

    (PollerHandle { command_tx }, poller)
}

impl NotificationPoller {
    /// Runs until stopped or every handle is dropped.
    ///
    /// The first poll happens immediately. A slow poll delays the next tick
    /// rather than bursting to catch up.
    pub async fn run(mut self) {
        info!(
            "notification poller started for {} (every {:?})",
            self.center.viewer().role,
            self.poll_interval
        );

        let mut poll_interval = tokio::time::interval(self.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prune_interval = tokio::time::interval(self.prune_interval);
        prune_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Sweep once the first interval has passed, not at startup
        prune_interval.tick().await;

        loop {
            tokio::select! {
                _ = poll_interval.tick() => self.poll().await,
                _ = prune_interval.tick() => {
                    self.center.prune_expired().await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PollerCommand::Stop) => {
                            info!("notification poller stopping");
                            break;
                        }
                        Some(PollerCommand::PollNow) => {
                            self.poll().await;
                            poll_interval.reset();
                        }
                        Some(PollerCommand::PruneNow) => {
                            self.center.prune_expired().await;
                        }
                        None => {
                            info!("command channel closed, stopping notification poller");
                            break;
                        }
                    }
                }
            }
        }

        info!("notification poller stopped");
    }

    async fn poll(&self) {
        let report = self.center.poll_once().await;
        match report.error {
            Some(e) => warn!("notification poll failed: {e}"),
            None if !report.merge.is_noop() => debug!(
                "notification poll: {} new, {} updated, {} unread",
                report.merge.new_ids.len(),
                report.merge.updated,
                report.unread
            ),
            None => {}
        }
    }
}
