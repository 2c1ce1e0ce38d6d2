use httpmock::prelude::*;
use httpmock::Method::PATCH;
use record_store::domain::ports::DocumentStore;
use record_store::{
    AuthSession, FirestoreClient, MemoryAuthProvider, NewRecord, RecordPatch, RecordStore,
    StoreConfig, StoreError,
};
use serde_json::json;

const COLLECTION_PATH: &str = "/v1/projects/demo/databases/(default)/documents/products";

fn config(server: &MockServer) -> StoreConfig {
    StoreConfig {
        api_key: "test-key".to_string(),
        project_id: "demo".to_string(),
        firestore_endpoint: server.base_url(),
        ..StoreConfig::default()
    }
}

fn doc_name(id: &str) -> String {
    format!("projects/demo/databases/(default)/documents/products/{}", id)
}

#[tokio::test]
async fn test_create_posts_typed_fields() {
    let server = MockServer::start();
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path(COLLECTION_PATH)
            .query_param("key", "test-key")
            .json_body(json!({
                "fields": {
                    "name": {"stringValue": "Widget"},
                    "price": {"doubleValue": 9.99},
                    "createdAt": {"integerValue": "1700000000000"}
                }
            }));
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "name": doc_name("abc123"),
                "fields": {
                    "name": {"stringValue": "Widget"},
                    "price": {"doubleValue": 9.99},
                    "createdAt": {"integerValue": "1700000000000"}
                },
                "createTime": "2023-11-14T22:13:20Z"
            }));
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let store = RecordStore::new(client, "products").with_clock(|| 1_700_000_000_000);

    let id = store.create(NewRecord::new("Widget", 9.99)).await.unwrap();

    create_mock.assert();
    assert_eq!(id, "abc123");
}

#[tokio::test]
async fn test_list_follows_page_tokens_and_sorts() {
    let server = MockServer::start();
    let first_page = server.mock(|when, then| {
        when.method(GET)
            .path(COLLECTION_PATH)
            .query_param("pageSize", "300")
            .matches(|req| {
                !req.query_params
                    .as_ref()
                    .is_some_and(|params| params.iter().any(|(k, _)| k == "pageToken"))
            });
        then.status(200).json_body(json!({
            "documents": [{
                "name": doc_name("old"),
                "fields": {
                    "name": {"stringValue": "Old"},
                    "price": {"integerValue": "5"},
                    "createdAt": {"integerValue": "100"}
                }
            }],
            "nextPageToken": "p2"
        }));
    });
    let second_page = server.mock(|when, then| {
        when.method(GET)
            .path(COLLECTION_PATH)
            .query_param("pageToken", "p2");
        then.status(200).json_body(json!({
            "documents": [{
                "name": doc_name("new"),
                "fields": {
                    "name": {"stringValue": "New"},
                    "description": {"stringValue": "Fresh"},
                    "price": {"doubleValue": 7.5},
                    "createdAt": {"integerValue": "200"}
                }
            }]
        }));
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let store = RecordStore::new(client, "products");
    let records = store.list().await.unwrap();

    first_page.assert();
    second_page.assert();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "new");
    assert_eq!(records[0].description.as_deref(), Some("Fresh"));
    assert_eq!(records[1].id, "old");
    assert_eq!(records[1].price, 5.0);
}

#[tokio::test]
async fn test_empty_collection_lists_nothing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(COLLECTION_PATH);
        then.status(200).json_body(json!({}));
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let records = RecordStore::new(client, "products").list().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_update_uses_field_mask_and_existence_precondition() {
    let server = MockServer::start();
    let patch_mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/abc123", COLLECTION_PATH))
            .query_param("updateMask.fieldPaths", "price")
            .query_param("currentDocument.exists", "true")
            .json_body(json!({"fields": {"price": {"doubleValue": 12.99}}}));
        then.status(200).json_body(json!({
            "name": doc_name("abc123"),
            "fields": {"price": {"doubleValue": 12.99}}
        }));
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let store = RecordStore::new(client, "products");
    store
        .update("abc123", RecordPatch::default().price(12.99))
        .await
        .unwrap();

    patch_mock.assert();
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PATCH).path(format!("{}/gone", COLLECTION_PATH));
        then.status(404).json_body(json!({
            "error": {"code": 404, "message": "No document to update", "status": "NOT_FOUND"}
        }));
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let err = RecordStore::new(client, "products")
        .update("gone", RecordPatch::default().name("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_maps_errors() {
    let server = MockServer::start();
    let ok_mock = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("{}/abc123", COLLECTION_PATH))
            .query_param("currentDocument.exists", "true");
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(DELETE).path(format!("{}/locked", COLLECTION_PATH));
        then.status(403).json_body(json!({
            "error": {
                "code": 403,
                "message": "Missing or insufficient permissions.",
                "status": "PERMISSION_DENIED"
            }
        }));
    });
    server.mock(|when, then| {
        when.method(DELETE).path(format!("{}/broken", COLLECTION_PATH));
        then.status(503).body("upstream unavailable");
    });

    let client = FirestoreClient::new(&config(&server)).unwrap();
    let store = RecordStore::new(client, "products");

    store.delete("abc123").await.unwrap();
    ok_mock.assert();

    let err = store.delete("locked").await.unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied { ref message } if message.contains("insufficient")));

    let err = store.delete("broken").await.unwrap_err();
    assert!(matches!(err, StoreError::BackendError { status: 503, .. }));
}

#[tokio::test]
async fn test_signed_in_requests_carry_bearer_token() {
    let server = MockServer::start();
    let authed = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/abc123", COLLECTION_PATH))
            .header("authorization", "Bearer token-uid-1");
        then.status(200).json_body(json!({
            "name": doc_name("abc123"),
            "fields": {
                "name": {"stringValue": "Widget"},
                "price": {"doubleValue": 1.0},
                "createdAt": {"integerValue": "1"}
            }
        }));
    });

    let provider = MemoryAuthProvider::new()
        .with_account("ada@example.com", "correct-horse")
        .await;
    let session = AuthSession::new(provider);
    session
        .sign_in("ada@example.com", "correct-horse")
        .await
        .unwrap();

    let client = FirestoreClient::new(&config(&server))
        .unwrap()
        .with_auth(session.user_watch());
    let document = client.get_document("products", "abc123").await.unwrap();

    authed.assert();
    assert_eq!(document.fields["name"], json!("Widget"));
}

#[tokio::test]
async fn test_missing_project_fails_on_first_use() {
    let server = MockServer::start();
    let config = StoreConfig {
        firestore_endpoint: server.base_url(),
        ..StoreConfig::default()
    };

    let client = FirestoreClient::new(&config).unwrap();
    let err = RecordStore::new(client, "products").list().await.unwrap_err();
    assert!(matches!(err, StoreError::ConfigError { .. }));
}
