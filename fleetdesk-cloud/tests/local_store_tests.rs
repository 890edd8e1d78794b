use fleetdesk_cloud::{FileLocalStore, LocalStore, MemoryLocalStore};
use tempfile::TempDir;

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryLocalStore::new();
    assert!(store.get("staff_data").is_none());

    store.set("staff_data", "[]").unwrap();
    assert_eq!(store.get("staff_data").as_deref(), Some("[]"));

    store.remove("staff_data").unwrap();
    assert!(store.get("staff_data").is_none());
}

#[test]
fn memory_store_keys_are_sorted() {
    let store = MemoryLocalStore::new();
    store.set("vendor_data", "1").unwrap();
    store.set("app_settings", "2").unwrap();
    assert_eq!(store.keys(), vec!["app_settings", "vendor_data"]);
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.json");

    {
        let store = FileLocalStore::open(&path).unwrap();
        store.set("app_settings", r#"{"lang":"en"}"#).unwrap();
        store.set("vendor_data", "[]").unwrap();
        store.remove("vendor_data").unwrap();
    }

    let reopened = FileLocalStore::open(&path).unwrap();
    assert_eq!(reopened.get("app_settings").as_deref(), Some(r#"{"lang":"en"}"#));
    assert!(reopened.get("vendor_data").is_none());
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn file_store_missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = FileLocalStore::open(&dir.path().join("nested/local.json")).unwrap();
    assert!(store.keys().is_empty());

    // Parent directories are created on first write.
    store.set("k", "v").unwrap();
    assert!(dir.path().join("nested/local.json").exists());
}

#[test]
fn file_store_corrupt_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local.json");
    std::fs::write(&path, "definitely not json").unwrap();

    let store = FileLocalStore::open(&path).unwrap();
    assert!(store.keys().is_empty());
}

#[test]
fn failed_file_write_leaves_store_unchanged() {
    let dir = TempDir::new().unwrap();
    let parent = dir.path().join("data");
    let store = FileLocalStore::open(&parent.join("local.json")).unwrap();
    store.set("app_settings", "v1").unwrap();

    // Replace the parent directory with a plain file so the next write fails.
    std::fs::remove_dir_all(&parent).unwrap();
    std::fs::write(&parent, "blocker").unwrap();

    assert!(store.set("app_settings", "v2").is_err());
    assert!(store.set("vendor_data", "[]").is_err());
    assert!(store.remove("app_settings").is_err());
    assert_eq!(store.get("app_settings").as_deref(), Some("v1"));
    assert_eq!(store.keys(), vec!["app_settings"]);
}
