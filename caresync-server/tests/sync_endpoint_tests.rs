use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use caresync_server::{create_app, CareSyncServer, ServerSettings};
use record_sync::{
    HttpSyncTransport, HttpTransportConfig, MedicalRecord, MemoryRecordStore, PassOutcome,
    RecordStore, ReconcilerConfig, SyncReconciler, SyncStatus,
};

fn app() -> Router {
    create_app(CareSyncServer::new(ServerSettings::default()))
}

fn record(id: &str) -> Value {
    json!({
        "id": id,
        "patientName": "Jane Doe",
        "diagnosis": "Influenza",
        "treatment": "Rest and fluids",
        "date": "2024-03-02",
        "createdBy": "nurse-7",
        "syncStatus": "pending"
    })
}

async fn post_sync(body: impl Into<Body>) -> (StatusCode, Value) {
    post_to("/api/sync", body).await
}

async fn post_to(uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_accepts_all_valid_records() {
    let batch = json!([record("r1"), record("r2")]);
    let (status, body) = post_sync(batch.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "synced": ["r1", "r2"] }));
}

#[tokio::test]
async fn test_drops_records_with_empty_fields() {
    let mut bad = record("r2");
    bad["patientName"] = json!("");
    let batch = json!([record("r1"), bad]);

    let (status, body) = post_sync(batch.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "synced": ["r1"] }));
}

#[tokio::test]
async fn test_empty_array_yields_empty_list() {
    let (status, body) = post_sync("[]").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "synced": [] }));
}

#[tokio::test]
async fn test_contract_scenario_on_short_path() {
    let batch = json!([{
        "id": "1",
        "patientName": "Jane",
        "diagnosis": "Flu",
        "treatment": "Rest",
        "date": "2024-01-01",
        "createdBy": "drA"
    }]);
    let (status, body) = post_to("/sync", batch.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "synced": ["1"] }));

    let (status, body) = post_to("/sync", "\"not-an-array\"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Expected an array of records" }));
}

#[tokio::test]
async fn test_object_body_rejected() {
    let (status, body) = post_sync(json!({ "id": "r1" }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Expected an array of records" }));
}

#[tokio::test]
async fn test_unparsable_body_rejected() {
    let (status, body) = post_sync("[{\"id\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON payload" }));
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    for method in ["GET", "PUT", "DELETE"] {
        let request = Request::builder()
            .uri("/api/sync")
            .method(method)
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.headers()[header::ALLOW], "POST");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body["error"],
            "Method not allowed. Use POST to submit an array of records."
        );
    }
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

/// Client reconciler against a live server over HTTP
#[tokio::test]
async fn test_reconciler_round_trip_against_live_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });

    let store = Arc::new(MemoryRecordStore::new());
    store
        .upsert(MedicalRecord::new_pending(
            "visit-1", "Jane Doe", "Flu", "Rest", "2024-03-02", "nurse-7",
        ))
        .await
        .unwrap();
    store
        .upsert(
            MedicalRecord::new_pending(
                "visit-2", "John Roe", "Sprain", "Ice", "2024-03-02", "nurse-7",
            )
            .with_file_path("/scans/visit-2.png"),
        )
        .await
        .unwrap();

    let transport = HttpSyncTransport::new(&HttpTransportConfig {
        endpoint_url: format!("http://{addr}/api/sync"),
        ..HttpTransportConfig::default()
    })
    .unwrap();
    let reconciler = SyncReconciler::new(store.clone(), Arc::new(transport), ReconcilerConfig::default());

    let report = reconciler.reconcile().await;
    assert_eq!(report.outcome, PassOutcome::Completed);
    assert_eq!(report.accepted, 2);

    for record in store.list_all().await.unwrap() {
        assert_eq!(record.sync_status, SyncStatus::Synced, "{}", record.id);
    }

    let again = reconciler.reconcile().await;
    assert_eq!(again.outcome, PassOutcome::NothingToSync);

    server.abort();
}
