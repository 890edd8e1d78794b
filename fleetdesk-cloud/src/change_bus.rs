//! Typed in-process change notifications.
//!
//! Independent parts of the console re-read the local store when told to.
//! Producers publish a [`DataChange`]; any number of subscribers receive it.

use tokio::sync::broadcast;
use tracing::trace;

const BUS_CAPACITY: usize = 256;

/// Which view of the data should refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshTopic {
    /// Any view backed by the local store.
    Storage,
    /// Attendance views.
    Attendance,
    /// The notification list.
    Notifications,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataChange {
    /// A local key was written and should be pushed soon.
    LocalWrite { key: String },
    /// These keys were written to the remote store.
    Pushed { keys: Vec<String> },
    /// These keys were overwritten locally from the remote store.
    Restored { keys: Vec<String> },
    /// Subscribers of the topic should re-read the local store.
    RefreshRequested(RefreshTopic),
}

/// Broadcast channel of [`DataChange`] values. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ChangeBus {
    tx: broadcast::Sender<DataChange>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.tx.subscribe()
    }

    /// Publishes a change. Having no subscribers is not an error.
    pub fn publish(&self, change: DataChange) {
        match self.tx.send(change) {
            Ok(n) => trace!("change delivered to {n} subscribers"),
            Err(broadcast::error::SendError(change)) => trace!("no subscribers for {change:?}"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
