//! Notification reconciler for FleetDesk.
//!
//! Keeps a local, deduplicated, newest-first view of the notifications a
//! signed-in user may see:
//! - Recipient filtering by role, tenant and employee
//! - Cache merge that keeps local-only entries and follows remote read flags
//! - Audible alert when the unread count rises
//! - Restore-on-activity with exponential backoff
//! - Retention sweep of old notifications
//! - Background poller driven through a command handle

pub mod alert;
pub mod cache;
pub mod center;
pub mod filter;
pub mod poller;
pub mod refresh;
pub mod retention;
pub mod types;

pub use alert::{AlertSink, AlertTracker, BellSink, PlaybackBlocked, SilentSink};
pub use cache::{MergeReport, NotificationCache};
pub use center::{send_system_notification, NotificationCenter, PollPhase, PollReport};
pub use poller::{create_notification_poller, NotificationPoller, PollerHandle};
pub use refresh::{ActivityRefresh, RefreshResult};
pub use retention::RetentionPolicy;
pub use types::*;
