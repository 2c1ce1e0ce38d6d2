use record_store::domain::ports::DocumentStore;
use record_store::{MemoryDocumentStore, NewRecord, RecordPatch, RecordStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn store() -> RecordStore<MemoryDocumentStore> {
    RecordStore::new(MemoryDocumentStore::new(), "products")
}

#[tokio::test]
async fn test_widget_lifecycle() {
    let store = store();

    let id = store
        .create(NewRecord::new("Widget", 9.99))
        .await
        .unwrap();

    let records = store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    let created = records[0].clone();
    assert_eq!(created.id, id);
    assert_eq!(created.name, "Widget");
    assert_eq!(created.price, 9.99);
    assert!(created.created_at > 0);

    assert_ok!(store.update(&id, RecordPatch::default().price(12.99)).await);
    let updated = store.get(&id).await.unwrap();
    assert_eq!(updated.price, 12.99);
    assert_eq!(updated.name, "Widget");
    assert_eq!(updated.created_at, created.created_at);

    assert_ok!(store.delete(&id).await);
    assert!(store.list().await.unwrap().iter().all(|r| r.id != id));
}

#[tokio::test]
async fn test_created_id_listed_exactly_once() {
    let store = store();
    let id = store
        .create(
            NewRecord::new("Gadget", 3.5)
                .with_description("Handy")
                .with_details("Comes in blue"),
        )
        .await
        .unwrap();

    let records = store.list().await.unwrap();
    assert_eq!(records.iter().filter(|r| r.id == id).count(), 1);
    assert_eq!(records[0].description.as_deref(), Some("Handy"));
    assert_eq!(records[0].details.as_deref(), Some("Comes in blue"));
}

#[tokio::test]
async fn test_update_merges_and_is_idempotent() {
    let store = store();
    let id = store
        .create(NewRecord::new("Widget", 1.0).with_description("Original"))
        .await
        .unwrap();
    let before = store.get(&id).await.unwrap();

    let patch = RecordPatch::default().name("Widget Pro").details("Now with more");
    store.update(&id, patch.clone()).await.unwrap();
    let once = store.get(&id).await.unwrap();
    store.update(&id, patch).await.unwrap();
    let twice = store.get(&id).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.name, "Widget Pro");
    assert_eq!(once.details.as_deref(), Some("Now with more"));
    assert_eq!(once.description.as_deref(), Some("Original"));
    assert_eq!(once.price, 1.0);
    assert_eq!(once.created_at, before.created_at);
}

#[tokio::test]
async fn test_empty_update_changes_nothing() {
    let store = store();
    let id = store.create(NewRecord::new("Widget", 1.0)).await.unwrap();
    let before = store.get(&id).await.unwrap();

    assert_ok!(store.update(&id, RecordPatch::default()).await);
    assert_eq!(store.get(&id).await.unwrap(), before);
}

#[tokio::test]
async fn test_deleted_record_is_not_resurrected() {
    let store = store();
    let id = store.create(NewRecord::new("Widget", 1.0)).await.unwrap();
    store.delete(&id).await.unwrap();

    let err = assert_err!(store.update(&id, RecordPatch::default().price(2.0)).await);
    assert!(err.is_not_found());
    let err = assert_err!(store.delete(&id).await);
    assert!(err.is_not_found());
    let err = assert_err!(store.get(&id).await);
    assert!(err.is_not_found());

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let store = store();
    let err = store
        .update("missing", RecordPatch::default().price(1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "missing"));
}

#[tokio::test]
async fn test_concurrent_creates_are_all_listed() {
    let store = Arc::new(store());
    let mut handles = Vec::new();
    for i in 0..25 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create(NewRecord::new(format!("Item {}", i), i as f64))
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }

    let records = store.list().await.unwrap();
    assert_eq!(ids.len(), 25);
    assert_eq!(records.len(), 25);
    let listed: HashSet<String> = records.into_iter().map(|r| r.id).collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_concurrent_deletes_of_one_id() {
    let store = Arc::new(store());
    let id = store.create(NewRecord::new("Widget", 1.0)).await.unwrap();

    let a = {
        let store = Arc::clone(&store);
        let id = id.clone();
        tokio::spawn(async move { store.delete(&id).await })
    };
    let b = {
        let store = Arc::clone(&store);
        let id = id.clone();
        tokio::spawn(async move { store.delete(&id).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(StoreError::is_not_found));
}

#[tokio::test]
async fn test_collection_parameter_separates_entities() {
    let shared = MemoryDocumentStore::new();
    let products = RecordStore::new(shared.clone(), "products");
    let archive = RecordStore::new(shared.clone(), "archived_products");

    products.create(NewRecord::new("Widget", 1.0)).await.unwrap();
    assert_eq!(products.list().await.unwrap().len(), 1);
    assert!(archive.list().await.unwrap().is_empty());
    assert_eq!(archive.collection(), "archived_products");
}

#[tokio::test]
async fn test_store_errors_propagate() {
    let backend = MemoryDocumentStore::new();
    let store = RecordStore::new(backend.clone(), "products");
    backend.set_deny_writes(true);

    let err = store.create(NewRecord::new("Widget", 1.0)).await.unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied { .. }));
}

#[tokio::test]
async fn test_foreign_documents_do_not_break_listing() {
    let backend = MemoryDocumentStore::new();
    let store = RecordStore::new(backend.clone(), "products");
    let id = store.create(NewRecord::new("Widget", 1.0)).await.unwrap();

    let legacy = serde_json::json!({"name": "Legacy", "price": 1.0});
    backend
        .add_document("products", legacy.as_object().cloned().unwrap())
        .await
        .unwrap();

    let records = store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(backend.len("products").await, 2);
}
