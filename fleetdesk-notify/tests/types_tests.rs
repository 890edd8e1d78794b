use fleetdesk_notify::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn notification_uses_wire_field_names() {
    let n: Notification = serde_json::from_value(json!({
        "id": "n1",
        "type": "new_enquiry",
        "title": "New enquiry",
        "message": "From ACME",
        "targetRoles": ["admin", "corporate"],
        "corporateId": "acme@example.com",
        "timestamp": "2026-03-01T10:00:00Z",
        "read": false
    }))
    .unwrap();

    assert_eq!(n.kind, NotificationType::NewEnquiry);
    assert_eq!(n.target_roles, vec![Role::Admin, Role::Corporate]);
    assert_eq!(n.corporate_id.as_deref(), Some("acme@example.com"));
    assert_eq!(n.employee_id, None);

    let back = serde_json::to_value(&n).unwrap();
    assert_eq!(back["type"], "new_enquiry");
    assert_eq!(back["targetRoles"], json!(["admin", "corporate"]));
    assert!(back.get("employeeId").is_none());
}

#[test]
fn unknown_type_is_kept_verbatim() {
    let n: Notification = serde_json::from_value(json!({
        "id": "n1",
        "type": "fuel_alert",
        "title": "Low fuel",
        "targetRoles": ["ADMIN"]
    }))
    .unwrap();

    assert_eq!(n.kind, NotificationType::Other("fuel_alert".to_string()));
    assert!(!n.kind.signals_activity());
    assert_eq!(n.target_roles, vec![Role::Admin]);
    assert_eq!(n.timestamp, None);
    assert!(!n.read);
    assert_eq!(serde_json::to_value(&n).unwrap()["type"], "fuel_alert");
}

#[test]
fn login_and_system_signal_activity() {
    assert!(NotificationType::Login.signals_activity());
    assert!(NotificationType::System.signals_activity());
    assert!(!NotificationType::TaskAssigned.signals_activity());
    assert_eq!(NotificationType::from("login".to_string()), NotificationType::Login);
}

#[test]
fn draft_builders_set_scope() {
    let draft = NotificationDraft::new(
        NotificationType::AdvanceRequest,
        "Advance request",
        "Driver asked for an advance",
        vec![Role::Corporate],
    )
    .for_corporate("T1")
    .for_employee("E1")
    .with_link("/payroll");

    assert_eq!(draft.corporate_id.as_deref(), Some("T1"));
    assert_eq!(draft.employee_id.as_deref(), Some("E1"));
    assert_eq!(draft.link.as_deref(), Some("/payroll"));
}
