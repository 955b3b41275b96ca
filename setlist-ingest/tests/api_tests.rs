//! Integration tests for setlist-ingest HTTP endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::test_state;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Test helper: router over a fresh temp database
async fn create_test_app() -> (TempDir, axum::Router) {
    let (dir, state) = test_state().await.expect("Failed to create test state");
    (dir, setlist_ingest::build_router(state))
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = create_test_app().await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "setlist-ingest");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_import_requires_performance_id() {
    let (_dir, app) = create_test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/tracklist/import",
            json!({"candidates": [{"title": "Baby", "artist": "Four Tet", "timestampSeconds": 60}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_import_rejects_empty_candidates() {
    let (_dir, app) = create_test_app().await;

    let (status, _) = send(
        &app,
        post_json(
            "/tracklist/import",
            json!({"performanceId": Uuid::new_v4(), "candidates": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_then_read_tracklist() {
    let (_dir, app) = create_test_app().await;
    let performance_id = Uuid::new_v4();

    let (status, summary) = send(
        &app,
        post_json(
            "/tracklist/import",
            json!({
                "performanceId": performance_id,
                "sourceTag": "tracklist",
                "candidates": [
                    {"title": "Silhouettes", "artist": "Floating Points", "timestampSeconds": 60},
                    {"title": "Baby", "artist": "Four Tet", "timestampObject": {"minutes": 5, "seconds": 30}},
                    {"title": "Sun", "artist": "Caribou", "timestampSeconds": "12:30"}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["insertedCount"], 3);
    assert_eq!(summary["existingCount"], 0);
    assert_eq!(summary["finalCount"], 3);
    assert_eq!(summary["errorCount"], 0);

    let (status, tracklist) = send(&app, get(&format!("/performances/{}/tracklist", performance_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracklist["count"], 3);
    let entries = tracklist["entries"].as_array().unwrap();
    assert_eq!(entries[1]["trackTitle"], "Baby");
    assert_eq!(entries[1]["timestampSeconds"], 330);
    assert_eq!(entries[2]["timestampFormatted"], "12:30");
    assert_eq!(entries[0]["sourceTag"], "tracklist");
}

#[tokio::test]
async fn test_tracklist_rejects_malformed_id() {
    let (_dir, app) = create_test_app().await;
    let (status, _) = send(&app, get("/performances/not-a-uuid/tracklist")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extract_endpoint() {
    let (_dir, app) = create_test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/tracklist/extract",
            json!({"blobs": [
                {"kind": "comment", "text": "the drop at 45:10 Strings of Life by Derrick May", "weight": 12},
                {"kind": "comment", "text": "anyone know this one?"}
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["title"], "Strings of Life");
    assert_eq!(candidates[0]["timestampSeconds"], 2710);

    let (status, _) = send(&app, post_json("/tracklist/extract", json!({"blobs": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingest_extracts_and_imports() {
    let (_dir, app) = create_test_app().await;
    let performance_id = Uuid::new_v4();
    let payload = json!({
        "performanceId": performance_id,
        "coverArtUrl": "https://img.example/set.jpg",
        "blobs": [{
            "kind": "description",
            "text": "1:00 Silhouettes - Floating Points\n5:30 Baby - Four Tet\n12:30 One More Time - Daft Punk"
        }]
    });

    let (status, body) = send(&app, post_json("/tracklist/ingest", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["insertedCount"], 3);

    let (_, replay) = send(&app, post_json("/tracklist/ingest", payload)).await;
    assert_eq!(replay["summary"]["insertedCount"], 0);
    assert_eq!(replay["summary"]["confirmedCount"], 3);

    let (_, tracklist) = send(&app, get(&format!("/performances/{}/tracklist", performance_id))).await;
    assert_eq!(tracklist["entries"][0]["sourceTag"], "description");
}

#[tokio::test]
async fn test_dedup_dry_run_endpoint() {
    let (_dir, app) = create_test_app().await;

    let (status, body) = send(&app, post_json("/maintenance/dedup?dry_run=true", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dryRun"], true);
    assert_eq!(body["artistGroups"], 0);
}
