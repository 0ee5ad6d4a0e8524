//! Local API router tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cloud_console::server::{router, ServerState};
use cloud_console::session::Cloud;
use cloud_console::storage::{BlobStore, MemoryBlobStore};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::fixtures::*;
use crate::mock::{Reply, ScriptedRemote};

async fn app() -> (Router, Arc<Cloud>, Arc<ScriptedRemote>, Arc<MemoryBlobStore>) {
    let (cloud, remote) = logged_in().await;
    let store = Arc::new(MemoryBlobStore::new());
    let state = Arc::new(ServerState::new(cloud.clone(), store.clone()));
    (router(state), cloud, remote, store)
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_session() {
    let (app, _, _, _) = app().await;
    let (status, body) = call(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["logged_in"], true);
    assert_eq!(body["connected"], true);
    assert_eq!(body["tasks_in_progress"], 0);
}

#[tokio::test]
async fn test_vapps_carry_status_labels() {
    let (app, _, _, _) = app().await;
    let (status, body) = call(app.clone(), get("/vapps?sort=date")).await;

    assert_eq!(status, StatusCode::OK);
    let vapps = body.as_array().unwrap();
    assert_eq!(vapps.len(), 1);
    assert_eq!(vapps[0]["attr"]["id"], VAPP_ID);
    assert_eq!(vapps[0]["status"], "Partially On");

    let (status, body) = call(app, get(&format!("/vapps/{}", VAPP_ID))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vms"].as_array().unwrap().len(), 2);
    assert_eq!(body["vms"][1]["status"], "Powered Off");
}

#[tokio::test]
async fn test_unknown_vapp_is_not_found() {
    let (app, _, _, _) = app().await;
    let (status, body) = call(app, get("/vapps/urn:vcloud:vapp:none")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("urn:vcloud:vapp:none"));
}

#[tokio::test]
async fn test_favorite_toggles_entity() {
    let (app, cloud, _, _) = app().await;
    let uri = format!("/entities/{}/favorite", VAPP_ID);

    let (status, body) = call(app.clone(), with_json("PUT", &uri, json!({ "favorite": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorite"], true);
    assert!(cloud.vapp(VAPP_ID).unwrap().favorite);

    let (status, _) = call(
        app,
        with_json("PUT", "/entities/urn:vcloud:vm:none/favorite", json!({ "favorite": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_action_reports_pending_task() {
    let (app, _, remote, _) = app().await;
    let href = url("task/a1");
    remote.on(
        "POST",
        &url("vApp/vm-3f1c/power/action/suspend"),
        Reply::ok(task(&href, "queued", "vappSuspend", &url("vApp/vm-3f1c"))),
    );

    let request = Request::post(format!("/entities/{}/actions/power:suspend", VM_ON_ID))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "pending");
    assert_eq!(body["task"], Value::Null);

    let (_, health) = call(app, get("/health")).await;
    assert_eq!(health["tasks_in_progress"], 1);
}

#[tokio::test]
async fn test_missing_link_is_not_found() {
    let (app, _, _, _) = app().await;
    let request = Request::post(format!("/entities/{}/actions/power:suspend", VM_OFF_ID))
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_filters_catalog() {
    let (app, _, _, _) = app().await;
    let (status, body) = call(app, with_json("POST", "/search", json!({ "cpu": "2-" }))).await;

    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["attr"]["name"], "windows-large");
}

#[tokio::test]
async fn test_catalog_page_rejects_out_of_range_input() {
    let (app, cloud, remote, _) = app().await;
    let before = remote.requests().len();
    let templates = cloud.catalog().len();

    let (status, body) = call(
        app.clone(),
        with_json("POST", "/catalog/page", json!({ "page": 100_000_000u64, "size": 128 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (status, _) = call(
        app.clone(),
        with_json("POST", "/catalog/page", json!({ "page": u64::MAX, "size": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(app, with_json("POST", "/catalog/page", json!({ "page": 1, "size": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(remote.requests().len(), before);
    assert_eq!(cloud.catalog().len(), templates);
}

#[tokio::test]
async fn test_metrics_and_tasks() {
    let (app, _, _, _) = app().await;
    let (status, body) = call(app.clone(), get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_memory"], 1024);

    let (status, body) = call(app, get("/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_cache_writes_blob_store() {
    let (app, cloud, _, store) = app().await;
    let request = Request::post("/cache/save").body(Body::empty()).unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(body["bytes"], saved.len());
    assert_eq!(saved, cloud.save_cache_blob().unwrap());
}
