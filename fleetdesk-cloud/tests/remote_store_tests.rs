use fleetdesk_cloud::error::CloudError;
use fleetdesk_cloud::remote_store::{merge_patch, MemoryRemoteStore, RemoteStore};
use pretty_assertions::assert_eq;
use serde_json::json;

// --- merge_patch ---

#[test]
fn patch_overwrites_only_named_fields() {
    let mut doc = json!({ "title": "Fuel", "read": false });
    merge_patch(&mut doc, json!({ "read": true }));
    assert_eq!(doc, json!({ "title": "Fuel", "read": true }));
}

#[test]
fn non_object_patch_replaces_document() {
    let mut doc = json!({ "a": 1 });
    merge_patch(&mut doc, json!("raw"));
    assert_eq!(doc, json!("raw"));

    let mut scalar = json!(3);
    merge_patch(&mut scalar, json!({ "a": 1 }));
    assert_eq!(scalar, json!({ "a": 1 }));
}

// --- MemoryRemoteStore ---

#[tokio::test]
async fn documents_come_back_in_id_order() {
    let store = MemoryRemoteStore::new();
    for id in ["c", "a", "b"] {
        store.set_document("col", id, json!({ "id": id })).await.unwrap();
    }

    let ids: Vec<String> = store
        .get_all_documents("col")
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(store.get_all_documents("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
    let store = MemoryRemoteStore::new();
    let err = store
        .update_document("col", "nope", json!({ "read": true }))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::NotFound(_)));
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn update_merges_and_counts_writes() {
    let store = MemoryRemoteStore::new();
    store
        .set_document("col", "n1", json!({ "title": "t", "read": false }))
        .await
        .unwrap();
    store
        .update_document("col", "n1", json!({ "read": true }))
        .await
        .unwrap();

    assert_eq!(
        store.document("col", "n1").await,
        Some(json!({ "title": "t", "read": true }))
    );
    assert_eq!(store.write_count().await, 2);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = MemoryRemoteStore::new();
    store.set_document("col", "n1", json!({})).await.unwrap();
    store.delete_document("col", "n1").await.unwrap();
    store.delete_document("col", "n1").await.unwrap();
    assert!(store.document("col", "n1").await.is_none());
}

#[tokio::test]
async fn failing_ids_reject_writes() {
    let store = MemoryRemoteStore::new();
    store.fail_writes_for("bad").await;

    assert!(store.set_document("col", "bad", json!({})).await.is_err());
    assert!(store.set_document("col", "good", json!({})).await.is_ok());
}

#[tokio::test]
async fn offline_store_rejects_everything() {
    let store = MemoryRemoteStore::new();
    store.set_offline(true).await;

    assert!(store.sign_in_anonymously().await.is_err());
    assert!(!store.is_authenticated().await);
    assert!(store.get_all_documents("col").await.is_err());

    store.set_offline(false).await;
    store.sign_in_anonymously().await.unwrap();
    assert!(store.is_authenticated().await);
}

#[tokio::test]
async fn blobs_are_stored_with_url() {
    let store = MemoryRemoteStore::new();
    let url = store.upload_blob("logos/acme.png", vec![1, 2, 3]).await.unwrap();
    assert_eq!(url, "memory://blobs/logos/acme.png");
    assert_eq!(store.blob("logos/acme.png").await, Some(vec![1, 2, 3]));
}
