//! Notification domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Console role of a user or a notification target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Head office. Sees every unscoped notification.
    #[serde(alias = "ADMIN")]
    Admin,
    /// A franchise account (tenant).
    #[serde(alias = "CORPORATE")]
    Corporate,
    /// An individual staff member.
    #[serde(alias = "EMPLOYEE")]
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Corporate => write!(f, "corporate"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

/// What a notification is about. Unknown producer types are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    NewEnquiry,
    TaskAssigned,
    Login,
    System,
    AdvanceRequest,
    LeaveRequest,
    Attendance,
    Payment,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::NewEnquiry => "new_enquiry",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::Login => "login",
            NotificationType::System => "system",
            NotificationType::AdvanceRequest => "advance_request",
            NotificationType::LeaveRequest => "leave_request",
            NotificationType::Attendance => "attendance",
            NotificationType::Payment => "payment",
            NotificationType::Other(s) => s,
        }
    }

    /// Login and system notifications signal activity elsewhere that may have changed shared data.
    pub fn signals_activity(&self) -> bool {
        matches!(self, NotificationType::Login | NotificationType::System)
    }
}

impl From<String> for NotificationType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new_enquiry" => NotificationType::NewEnquiry,
            "task_assigned" => NotificationType::TaskAssigned,
            "login" => NotificationType::Login,
            "system" => NotificationType::System,
            "advance_request" => NotificationType::AdvanceRequest,
            "leave_request" => NotificationType::LeaveRequest,
            "attendance" => NotificationType::Attendance,
            "payment" => NotificationType::Payment,
            _ => NotificationType::Other(s),
        }
    }
}

impl From<NotificationType> for String {
    fn from(t: NotificationType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Empty on the wire means "use the document id".
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target_roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Absent on some producers; defaulted when merged into the cache.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn targets(&self, role: Role) -> bool {
        self.target_roles.contains(&role)
    }

    /// True if the notification is not scoped to a tenant or an employee.
    pub fn is_unscoped(&self) -> bool {
        self.corporate_id.is_none() && self.employee_id.is_none()
    }
}

/// Fields a producer supplies; id, timestamp and read state are assigned on send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationDraft {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub target_roles: Vec<Role>,
    pub corporate_id: Option<String>,
    pub employee_id: Option<String>,
    pub link: Option<String>,
}

impl NotificationDraft {
    pub fn new(
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        target_roles: Vec<Role>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            target_roles,
            corporate_id: None,
            employee_id: None,
            link: None,
        }
    }

    pub fn for_corporate(mut self, corporate_id: impl Into<String>) -> Self {
        self.corporate_id = Some(corporate_id.into());
        self
    }

    pub fn for_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// The signed-in user whose notifications are being reconciled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewer {
    pub role: Role,
    /// Tenant id (franchise email) for corporate viewers.
    pub tenant_id: Option<String>,
    /// Own id for employee viewers.
    pub user_id: Option<String>,
}

impl Viewer {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            tenant_id: None,
            user_id: None,
        }
    }

    pub fn corporate(tenant_id: impl Into<String>) -> Self {
        Self {
            role: Role::Corporate,
            tenant_id: Some(tenant_id.into()),
            user_id: None,
        }
    }

    pub fn employee(user_id: impl Into<String>) -> Self {
        Self {
            role: Role::Employee,
            tenant_id: None,
            user_id: Some(user_id.into()),
        }
    }
}
