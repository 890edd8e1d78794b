use fleetdesk_cloud::keys::*;
use fleetdesk_cloud::{LocalStore, MemoryLocalStore};

#[test]
fn namespaced_key_appends_tenant() {
    assert_eq!(namespaced_key("staff_data", "t1@fleet.test"), "staff_data_t1@fleet.test");
}

#[test]
fn no_registry_means_no_tenants() {
    let store = MemoryLocalStore::new();
    assert!(tenant_ids(&store).is_empty());
}

#[test]
fn malformed_registry_means_no_tenants() {
    let store = MemoryLocalStore::new();
    store.set(TENANT_REGISTRY_KEY, r#"{"email":"x"}"#).unwrap();
    assert!(tenant_ids(&store).is_empty());
}

#[test]
fn registry_entries_without_email_are_skipped() {
    let store = MemoryLocalStore::new();
    store
        .set(
            TENANT_REGISTRY_KEY,
            r#"[{"email":"a@fleet.test","name":"A"},{"name":"no email"},{"email":"  "},{"email":"a@fleet.test"},{"email":"b@fleet.test"}]"#,
        )
        .unwrap();
    assert_eq!(tenant_ids(&store), vec!["a@fleet.test", "b@fleet.test"]);
}

#[test]
fn candidates_without_tenants() {
    let store = MemoryLocalStore::new();
    let keys = sync_candidates(&store);
    assert_eq!(keys.len(), GLOBAL_KEYS.len() + NAMESPACED_KEYS.len());
    assert_eq!(keys[0], TENANT_REGISTRY_KEY);
    assert!(keys.contains(&"staff_data".to_string()));
}

#[test]
fn candidates_include_every_tenant_key_in_order() {
    let store = MemoryLocalStore::new();
    store
        .set(TENANT_REGISTRY_KEY, r#"[{"email":"a@x"},{"email":"b@x"}]"#)
        .unwrap();

    let keys = sync_candidates(&store);
    assert_eq!(keys.len(), GLOBAL_KEYS.len() + NAMESPACED_KEYS.len() * 3);

    let a = keys.iter().position(|k| k == "staff_data_a@x").unwrap();
    let b = keys.iter().position(|k| k == "staff_data_b@x").unwrap();
    assert!(a < b);
    assert!(keys.contains(&"fleet_vehicles_b@x".to_string()));
}
