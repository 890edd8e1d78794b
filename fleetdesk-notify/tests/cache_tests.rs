use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use fleetdesk_cloud::{LocalStore, MemoryLocalStore};
use fleetdesk_notify::cache::CACHE_KEY;
use fleetdesk_notify::*;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap()
}

fn note(id: &str, kind: NotificationType, minute: u32) -> Notification {
    Notification {
        id: id.to_string(),
        kind,
        title: format!("title {id}"),
        message: String::new(),
        target_roles: vec![Role::Admin],
        corporate_id: None,
        employee_id: None,
        link: None,
        timestamp: Some(at(minute)),
        read: false,
    }
}

fn task(id: &str, minute: u32) -> Notification {
    note(id, NotificationType::TaskAssigned, minute)
}

fn ids(cache: &NotificationCache) -> Vec<&str> {
    cache.entries().iter().map(|n| n.id.as_str()).collect()
}

fn assert_unread_invariant(cache: &NotificationCache) {
    let counted = cache.entries().iter().filter(|n| !n.read).count();
    assert_eq!(cache.unread_count(), counted);
}

// ── Merge ──

#[test]
fn merge_inserts_new_entries_newest_first() {
    let mut cache = NotificationCache::new();
    let report = cache.merge(vec![task("a", 1), task("b", 3), task("c", 2)], at(59));

    assert_eq!(report.new_ids, vec!["a", "b", "c"]);
    assert_eq!(report.updated, 0);
    assert!(!report.activity_detected);
    assert_eq!(ids(&cache), vec!["b", "c", "a"]);
    assert_eq!(cache.unread_count(), 3);
}

#[test]
fn merging_same_fetch_twice_changes_nothing() {
    let fetch = vec![task("a", 1), task("b", 2)];
    let mut cache = NotificationCache::new();
    cache.merge(fetch.clone(), at(59));
    let snapshot = cache.clone();

    let report = cache.merge(fetch, at(59));
    assert!(report.is_noop());
    assert_eq!(cache, snapshot);
    assert_eq!(cache.len(), 2);
}

#[test]
fn local_only_entries_survive_merge() {
    let mut cache = NotificationCache::new();
    cache.merge(vec![task("a", 1), task("b", 2)], at(59));

    cache.merge(vec![task("c", 3)], at(59));
    assert_eq!(ids(&cache), vec!["c", "b", "a"]);
}

#[test]
fn known_entries_follow_remote_read_flag() {
    let mut cache = NotificationCache::new();
    cache.merge(vec![task("a", 1)], at(59));
    cache.mark_read("a");

    let report = cache.merge(vec![task("a", 1)], at(59));
    assert_eq!(report.updated, 1);
    assert!(report.new_ids.is_empty());
    assert!(!cache.get("a").unwrap().read);
    assert_unread_invariant(&cache);
}

#[test]
fn new_entries_arrive_unread_with_defaulted_timestamp() {
    let mut incoming = task("a", 0);
    incoming.timestamp = None;
    incoming.read = true;

    let mut cache = NotificationCache::new();
    cache.merge(vec![incoming], at(42));

    let stored = cache.get("a").unwrap();
    assert!(!stored.read);
    assert_eq!(stored.timestamp, Some(at(42)));
}

#[test]
fn duplicate_ids_in_one_fetch_are_collapsed() {
    let mut cache = NotificationCache::new();
    cache.merge(vec![task("a", 1), task("a", 1), task("", 2)], at(59));
    assert_eq!(ids(&cache), vec!["a"]);
}

#[test]
fn activity_is_detected_only_for_new_login_or_system() {
    let mut cache = NotificationCache::new();
    let report = cache.merge(vec![note("l", NotificationType::Login, 1)], at(59));
    assert!(report.activity_detected);

    let again = cache.merge(vec![note("l", NotificationType::Login, 1)], at(59));
    assert!(!again.activity_detected);

    let other = cache.merge(vec![note("p", NotificationType::Payment, 2)], at(59));
    assert!(!other.activity_detected);
}

// ── Read state ──

#[test]
fn mark_read_flips_once() {
    let mut cache = NotificationCache::from_entries(vec![task("a", 1), task("b", 2)]);

    assert!(cache.mark_read("a"));
    assert!(!cache.mark_read("a"));
    assert!(!cache.mark_read("missing"));
    assert_eq!(cache.unread_count(), 1);
    assert_unread_invariant(&cache);
}

#[test]
fn mark_all_read_returns_changed_ids() {
    let mut cache = NotificationCache::from_entries(vec![task("a", 1), task("b", 2), task("c", 3)]);
    cache.mark_read("b");

    let mut changed = cache.mark_all_read();
    changed.sort();
    assert_eq!(changed, vec!["a", "c"]);
    assert_eq!(cache.unread_count(), 0);
    assert!(cache.mark_all_read().is_empty());
}

// ── Persistence ──

#[test]
fn cache_round_trips_through_local_store() {
    let store = MemoryLocalStore::new();
    let cache = NotificationCache::from_entries(vec![task("a", 1), task("b", 2)]);
    cache.persist(&store).unwrap();

    assert_eq!(NotificationCache::load(&store), cache);
}

#[test]
fn corrupt_cache_loads_empty() {
    let store = MemoryLocalStore::new();
    store.set(CACHE_KEY, "{not json").unwrap();
    assert!(NotificationCache::load(&store).is_empty());
}

#[test]
fn loading_normalizes_order_and_duplicates() {
    let store = MemoryLocalStore::new();
    let raw = serde_json::to_string(&vec![task("a", 1), task("b", 5), task("a", 1)]).unwrap();
    store.set(CACHE_KEY, &raw).unwrap();

    let cache = NotificationCache::load(&store);
    assert_eq!(ids(&cache), vec!["b", "a"]);
}

// ── Retention ──

#[test]
fn prune_removes_only_expired_entries() {
    let now = at(0) + ChronoDuration::days(31);
    let mut fresh = task("fresh", 0);
    fresh.timestamp = Some(now - ChronoDuration::days(2));
    let mut undated = task("undated", 0);
    undated.timestamp = None;

    let mut cache = NotificationCache::from_entries(vec![task("old", 0), fresh, undated]);
    let expired = cache.prune(&RetentionPolicy::default(), now);

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, "old");
    assert_eq!(cache.len(), 2);
    assert!(cache.get("old").is_none());
}

#[test]
fn retention_boundary_is_exclusive() {
    let policy = RetentionPolicy::new(Duration::from_secs(60));
    let n = task("a", 0);

    assert!(!policy.is_expired(&n, at(1)));
    assert!(policy.is_expired(&n, at(1) + ChronoDuration::seconds(1)));
}
