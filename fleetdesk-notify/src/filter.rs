//! Recipient filtering.

use crate::types::{Notification, Role, Viewer};

/// Decides whether `viewer` should see `notification`.
///
/// Only unread notifications are visible. Admins see anything targeted at
/// admins plus every unscoped notification. Other roles must be targeted,
/// and a scope id on the notification must match their own.
pub fn is_visible_to(notification: &Notification, viewer: &Viewer) -> bool {
    if notification.read {
        return false;
    }

    match viewer.role {
        Role::Admin => notification.targets(Role::Admin) || notification.is_unscoped(),
        Role::Corporate => {
            notification.targets(Role::Corporate)
                && scope_matches(notification.corporate_id.as_deref(), viewer.tenant_id.as_deref())
        }
        Role::Employee => {
            notification.targets(Role::Employee)
                && scope_matches(notification.employee_id.as_deref(), viewer.user_id.as_deref())
        }
    }
}

/// An absent scope matches everyone; a present one only its owner.
fn scope_matches(scope: Option<&str>, own: Option<&str>) -> bool {
    match scope {
        None => true,
        Some(s) => own == Some(s),
    }
}

/// Keeps the notifications visible to `viewer`, preserving order.
pub fn visible_to(notifications: Vec<Notification>, viewer: &Viewer) -> Vec<Notification> {
    notifications
        .into_iter()
        .filter(|n| is_visible_to(n, viewer))
        .collect()
}
