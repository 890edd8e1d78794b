//! Local key scoping: global keys, per-tenant namespaced keys, and the tenant registry.

use crate::local_store::LocalStore;
use serde::Deserialize;
use tracing::warn;

/// Registry of franchise (tenant) accounts, a JSON array of objects with an `email`.
pub const TENANT_REGISTRY_KEY: &str = "corporate_accounts";

/// Keys shared by every tenant.
pub const GLOBAL_KEYS: &[&str] = &[
    TENANT_REGISTRY_KEY,
    "global_enquiries_data",
    "app_settings",
    "global_notifications",
    "vendor_data",
];

/// Keys that exist once per tenant as `<key>_<tenantId>`.
///
/// The unsuffixed form holds head-office data and is synced alongside the globals.
pub const NAMESPACED_KEYS: &[&str] = &[
    "staff_data",
    "attendance_data",
    "payroll_history",
    "leave_history",
    "driver_payment_records",
    "office_expenses",
    "branches_data",
    "fleet_vehicles",
];

/// Builds the tenant-scoped name of a namespaced key.
pub fn namespaced_key(base: &str, tenant_id: &str) -> String {
    format!("{base}_{tenant_id}")
}

#[derive(Deserialize)]
struct TenantEntry {
    #[serde(default)]
    email: Option<String>,
}

/// Reads tenant ids from the registry. Missing or malformed content gives an empty list.
pub fn tenant_ids(store: &dyn LocalStore) -> Vec<String> {
    let Some(raw) = store.get(TENANT_REGISTRY_KEY) else {
        return Vec::new();
    };

    let entries: Vec<TenantEntry> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("tenant registry is not a list of accounts: {e}");
            return Vec::new();
        }
    };

    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    for email in entries.into_iter().filter_map(|e| e.email) {
        let email = email.trim();
        if !email.is_empty() && !ids.iter().any(|id| id == email) {
            ids.push(email.to_string());
        }
    }
    ids
}

/// Every key the sync engine considers, in push order.
///
/// Globals come first, then head-office namespaced keys, then each tenant's
/// namespaced keys in registry order.
pub fn sync_candidates(store: &dyn LocalStore) -> Vec<String> {
    let tenants = tenant_ids(store);
    let mut keys: Vec<String> =
        Vec::with_capacity(GLOBAL_KEYS.len() + NAMESPACED_KEYS.len() * (tenants.len() + 1));

    keys.extend(GLOBAL_KEYS.iter().map(|k| k.to_string()));
    keys.extend(NAMESPACED_KEYS.iter().map(|k| k.to_string()));
    for tenant in &tenants {
        keys.extend(NAMESPACED_KEYS.iter().map(|k| namespaced_key(k, tenant)));
    }
    keys
}
