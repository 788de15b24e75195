mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::StubHttp;
use flowrun::{
    api::AppState,
    config::Config,
    server::{create_router, create_state},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

async fn app() -> (Router, AppState) {
    let state = create_state(&Config::ephemeral(), StubHttp::ok(200, json!({"temp": 3})))
        .await
        .unwrap();
    (create_router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn palette_lists_every_kind_with_defaults() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "GET", "/api/node-kinds", None).await;
    assert_eq!(status, StatusCode::OK);

    let kinds = body.as_array().unwrap();
    assert_eq!(kinds.len(), 7);
    let schedule = kinds.iter().find(|k| k["type"] == "schedule").unwrap();
    assert_eq!(schedule["triggerCapable"], json!(true));
    assert_eq!(schedule["defaultData"]["repeatIntervalUnit"], json!("seconds"));
}

#[tokio::test]
async fn build_and_run_a_flow() {
    let (app, state) = app().await;

    let (status, trigger) = send(&app, "POST", "/api/nodes", Some(json!({"type": "triggerNode"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(trigger["id"], json!("node_0"));

    let (_, number) = send(&app, "POST", "/api/nodes", Some(json!({"type": "customNumberNode"}))).await;
    assert_eq!(number["id"], json!("node_1"));
    assert_eq!(number["data"]["value"], json!(0));

    let (status, patched) = send(&app, "PATCH", "/api/nodes/node_1/data", Some(json!({"value": 42}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["data"]["value"], json!(42));

    send(&app, "POST", "/api/nodes", Some(json!({"type": "number", "id": "sink"}))).await;
    let (status, _) = send(&app, "POST", "/api/edges", Some(json!({"source": "node_0", "target": "node_1"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    send(&app, "POST", "/api/edges", Some(json!({"id": "e2", "source": "node_1", "target": "sink"}))).await;

    let (status, outcome) = send(&app, "POST", "/api/run/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["mode"], json!("completed"));
    assert_eq!(outcome["report"]["visited"], json!(["node_0", "node_1", "sink"]));

    let sink = state.graph.read().await.node_by_id("sink").unwrap().data.clone();
    assert_eq!(sink["value"], json!(42));

    let (_, flow) = send(&app, "GET", "/api/flow", None).await;
    let edge = flow["edges"].as_array().unwrap().iter().find(|e| e["id"] == "e2").unwrap().clone();
    assert_eq!(edge["type"], json!("success"));
    assert_eq!(edge["data"]["isActive"], json!(true));
}

#[tokio::test]
async fn edit_errors_map_to_status_codes() {
    let (app, _) = app().await;
    send(&app, "POST", "/api/nodes", Some(json!({"type": "trigger", "id": "t"}))).await;

    let (status, body) = send(&app, "POST", "/api/nodes", Some(json!({"type": "trigger", "id": "t"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("t"));

    let (status, _) = send(&app, "DELETE", "/api/nodes/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PATCH", "/api/nodes/ghost/data", Some(json!({"x": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // trigger without an outgoing edge
    let (status, body) = send(&app, "POST", "/api/run/start", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("No trigger"));
}

#[tokio::test]
async fn graph_is_locked_while_loop_is_armed() {
    let (app, _) = app().await;
    send(
        &app,
        "POST",
        "/api/nodes",
        Some(json!({"type": "schedule", "id": "s"})),
    )
    .await;
    send(
        &app,
        "PATCH",
        "/api/nodes/s/data",
        Some(json!({"repeatIntervalValue": 2, "repeatCount": 0})),
    )
    .await;
    send(&app, "POST", "/api/nodes", Some(json!({"type": "httpRequest", "id": "h"}))).await;
    send(&app, "POST", "/api/edges", Some(json!({"source": "s", "target": "h"}))).await;

    let (status, outcome) = send(&app, "POST", "/api/run/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["mode"], json!("armed"));
    assert_eq!(outcome["intervalMs"], json!(2000));

    let (status, _) = send(&app, "POST", "/api/nodes", Some(json!({"type": "number"}))).await;
    assert_eq!(status, StatusCode::LOCKED);
    let (status, _) = send(&app, "POST", "/api/flow/reset", None).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = send(&app, "POST", "/api/run/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status_body) = send(&app, "GET", "/api/run/status", None).await;
    assert_eq!(status_body["phase"], json!("armedLooping"));
    assert_eq!(status_body["locked"], json!(true));

    let (_, stopped) = send(&app, "POST", "/api/run/stop", None).await;
    assert_eq!(stopped["stopped"], json!(true));

    let (status, _) = send(&app, "POST", "/api/nodes", Some(json!({"type": "number"}))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn save_and_load_round_trip_clears_running_flags() {
    let (app, state) = app().await;
    send(&app, "POST", "/api/nodes", Some(json!({"type": "number", "id": "n"}))).await;
    send(&app, "PATCH", "/api/nodes/n/data", Some(json!({"value": 7, "isRunning": true}))).await;

    let (status, saved) = send(&app, "POST", "/api/flow/save", Some(json!({"name": "demo"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["nodes"], json!(1));

    let (status, _) = send(&app, "POST", "/api/flow/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.graph.read().await.nodes().is_empty());

    let (status, loaded) = send(&app, "POST", "/api/flow/load", Some(json!({"name": "demo"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["nodes"][0]["data"]["value"], json!(7));
    assert_eq!(loaded["nodes"][0]["data"]["isRunning"], json!(false));

    let (status, _) = send(&app, "POST", "/api/flow/load", Some(json!({"name": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, flows) = send(&app, "GET", "/api/flows", None).await;
    assert_eq!(flows["flows"][0]["name"], json!("demo"));
}

#[tokio::test]
async fn edit_queued_behind_a_start_sees_the_lock() {
    let (app, state) = app().await;
    send(&app, "POST", "/api/nodes", Some(json!({"type": "schedule", "id": "s"}))).await;
    send(
        &app,
        "PATCH",
        "/api/nodes/s/data",
        Some(json!({"repeatIntervalValue": 2, "repeatCount": 0})),
    )
    .await;
    send(&app, "POST", "/api/nodes", Some(json!({"type": "httpRequest", "id": "h"}))).await;
    send(&app, "POST", "/api/edges", Some(json!({"source": "s", "target": "h"}))).await;

    // both requests wait on the graph, start first
    let held = state.graph.write().await;
    let start = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, "POST", "/api/run/start", None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let edit = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&app, "POST", "/api/nodes", Some(json!({"type": "number", "id": "late"}))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(held);

    let (status, outcome) = start.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["mode"], json!("armed"));

    let (status, _) = edit.await.unwrap();
    assert_eq!(status, StatusCode::LOCKED);
    assert!(state.graph.read().await.node_by_id("late").is_none());

    send(&app, "POST", "/api/run/stop", None).await;
}
