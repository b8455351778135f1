//! End-to-end tests of the HTTP API, driven in-process through the router.
#![cfg(feature = "http-server")]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use clusterlab::config::TrainingConfig;
use clusterlab::http::envelope::{INCORRECT_JSON, INCORRECT_REQUEST, STATUS_OK};
use clusterlab::http::{AppState, router, with_static_files};
use clusterlab::{AreaStore, Point};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn app() -> Router {
    router(
        AppState::new(AreaStore::new(), TrainingConfig::default()),
        false,
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn create_area(app: &Router) -> i64 {
    let (status, body) = post(app, "/api/area", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], STATUS_OK);
    body["data"]["id"].as_i64().unwrap()
}

async fn seed_scenario(app: &Router, id: i64) {
    let (status, body) = post(
        app,
        "/api/cluster",
        json!({"id": id, "clusters": [[0, 0], [10, 10]]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, _) = post(
        app,
        "/api/point",
        json!({"id": id, "points": [[1, 1], [2, 2], {"x": 9, "y": 9}, [11, 11]]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_area_ids_are_sequential() {
    let app = app();
    assert_eq!(create_area(&app).await, 1);
    assert_eq!(create_area(&app).await, 2);
}

#[tokio::test]
async fn test_step_by_step_training() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(&app, "/api/train", json!({"id": id, "by_step": true})).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["finished"], false);
    assert_eq!(data["iterations"], 1);
    assert_eq!(data["clusters"][0]["center"], json!([1.5, 1.5]));
    assert_eq!(data["clusters"][0]["points"], json!([[1.0, 1.0], [2.0, 2.0]]));
    assert_eq!(data["clusters"][1]["center"], json!([10.0, 10.0]));
    assert_eq!(data["clusters"][1]["points"], json!([[9.0, 9.0], [11.0, 11.0]]));

    let (_, body) = post(&app, "/api/train", json!({"id": id, "by_step": true})).await;
    assert_eq!(body["data"]["finished"], true);
    assert_eq!(body["data"]["iterations"], 2);
}

#[tokio::test]
async fn test_full_training_uses_defaults() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(
        &app,
        "/api/train",
        json!({"id": id, "dist_id": 0, "max_age": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["finished"], true);
}

#[tokio::test]
async fn test_get_area_with_and_without_metric() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = get(&app, &format!("/api/area/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let clusters = body["data"]["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 2);
    // Read projection never moves centers
    assert_eq!(clusters[0]["center"], json!([0.0, 0.0]));

    let (status, body) = get(&app, &format!("/api/area/{id}/2")).await;
    assert_eq!(status, StatusCode::OK);
    let total: usize = body["data"]["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["points"].as_array().unwrap().len())
        .sum();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn test_zero_clusters_scenario() {
    let app = app();
    let id = create_area(&app).await;
    post(
        &app,
        "/api/point",
        json!({"id": id, "points": [[1, 2], [3, 4], [5, 6]]}),
    )
    .await;

    let (_, body) = post(&app, "/api/train", json!({"id": id})).await;
    assert_eq!(body["data"]["finished"], true);
    assert_eq!(body["data"]["clusters"], json!([]));

    let (_, body) = get(&app, &format!("/api/area/{id}")).await;
    assert_eq!(body["data"]["clusters"], json!([]));
}

#[tokio::test]
async fn test_clear_area() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(&app, "/api/clear", json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (_, body) = get(&app, &format!("/api/area/{id}")).await;
    assert_eq!(body["data"]["clusters"], json!([]));

    let (_, body) = post(&app, "/api/train", json!({"id": id, "by_step": true})).await;
    assert_eq!(body["data"]["finished"], true);

    // A different dimensionality is accepted after the clear
    let (status, _) = post(&app, "/api/point", json!({"id": id, "points": [[1, 2, 3]]})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dimension_mismatch_is_reported() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(&app, "/api/point", json!({"id": id, "points": [[1, 2, 3]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);
    assert_eq!(body["code"], "DIMENSION_MISMATCH");

    // The rejected point never landed
    let (_, body) = get(&app, &format!("/api/area/{id}")).await;
    let total: usize = body["data"]["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["points"].as_array().unwrap().len())
        .sum();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn test_unknown_identifiers() {
    let app = app();
    let id = create_area(&app).await;

    let (status, body) = post(&app, "/api/train", json!({"id": 999})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "UNKNOWN_AREA");
    assert!(body["message"].as_str().unwrap().contains("999"));

    let (status, body) = post(&app, "/api/train", json!({"id": id, "dist_id": 77})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "UNKNOWN_DISTANCE_FUNCTION");

    let (_, body) = get(&app, &format!("/api/area/{id}/77")).await;
    assert_eq!(body["code"], "UNKNOWN_DISTANCE_FUNCTION");

    let (_, body) = post(&app, "/api/clear", json!({"id": 12345})).await;
    assert_eq!(body["code"], "UNKNOWN_AREA");
}

#[tokio::test]
async fn test_negative_max_age_is_rejected() {
    let app = app();
    let id = create_area(&app).await;

    let (status, body) = post(&app, "/api/train", json!({"id": id, "max_age": -4})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_MAX_AGE");
}

#[tokio::test]
async fn test_malformed_input() {
    let app = app();
    let id = create_area(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/point")
        .body(Body::from("{\"id\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCORRECT_JSON);

    let (status, body) = post(&app, "/api/cluster", json!({"id": id, "clusters": "nope"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCORRECT_JSON);

    let (status, body) = get(&app, "/api/area/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCORRECT_REQUEST);

    let (status, body) = get(&app, &format!("/api/area/{id}/x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], INCORRECT_REQUEST);
}

#[tokio::test]
async fn test_form_encoded_json_is_accepted() {
    let app = app();
    let id = create_area(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/point")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(json!({"id": id, "points": [[0.5, 0.5]]}).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], STATUS_OK);
}

#[tokio::test]
async fn test_distance_catalog_and_health() {
    let app = app();

    let (status, body) = get(&app, "/api/distances").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0], json!({"id": 1, "name": "euclidean"}));
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_step_ignores_max_age() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(
        &app,
        "/api/train",
        json!({"id": id, "by_step": true, "max_age": -1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["iterations"], 1);
}

#[tokio::test]
async fn test_cluster_batch_validation() {
    let app = app();
    let id = create_area(&app).await;
    seed_scenario(&app, id).await;

    let (status, body) = post(
        &app,
        "/api/cluster",
        json!({"id": id, "clusters": [[5, 5], [1, 2, 3]]}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DIMENSION_MISMATCH");

    let (status, body) = post(&app, "/api/cluster", json!({"id": id, "clusters": [[]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_POINT");

    let (status, body) = post(&app, "/api/point", json!({"id": id, "points": [[]]})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_POINT");

    // Neither rejected batch changed the area
    let (_, body) = get(&app, &format!("/api/area/{id}")).await;
    assert_eq!(body["data"]["clusters"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_huge_coordinates_round_trip() {
    let app = app();
    let id = create_area(&app).await;
    post(&app, "/api/cluster", json!({"id": id, "clusters": [[0.0]]})).await;
    post(
        &app,
        "/api/point",
        json!({"id": id, "points": [[1.5e308], [1.5e308]]}),
    )
    .await;

    let (status, body) = post(&app, "/api/train", json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["finished"], true);
    assert_eq!(body["data"]["clusters"][0]["center"], json!([1.5e308]));
}

#[tokio::test(flavor = "current_thread")]
async fn test_other_areas_stay_responsive_during_training() {
    let store = AreaStore::new();
    let app = router(
        AppState::new(store.clone(), TrainingConfig::default()),
        false,
    );

    // Seeds bunched in one corner need many iterations to spread out
    let busy = store.create();
    let area = store.get(busy).unwrap();
    area.add_points(
        (0..20_000)
            .map(|i| Point::new(vec![f64::from(i % 200), f64::from(i / 200)]).unwrap())
            .collect(),
    )
    .unwrap();
    area.add_clusters(
        (0..32)
            .map(|k| Point::new(vec![f64::from(k) * 0.01, 0.0]).unwrap())
            .collect(),
    )
    .unwrap();

    let idle = store.create();
    store
        .get(idle)
        .unwrap()
        .add_point(Point::new(vec![1.0, 1.0]).unwrap())
        .unwrap();

    let started = Instant::now();
    let training = tokio::spawn({
        let app = app.clone();
        async move {
            post(&app, "/api/train", json!({"id": busy.get(), "max_age": 60})).await;
            started.elapsed()
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Queues on the busy area's lock
    let waiting = tokio::spawn({
        let app = app.clone();
        async move { get(&app, &format!("/api/area/{busy}")).await }
    });
    tokio::task::yield_now().await;

    let read_started = Instant::now();
    let (status, _) = get(&app, &format!("/api/area/{idle}")).await;
    let idle_elapsed = read_started.elapsed();
    assert_eq!(status, StatusCode::OK);

    let training_elapsed = training.await.unwrap();
    let (status, _) = waiting.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(
        idle_elapsed * 4 < training_elapsed,
        "idle read took {idle_elapsed:?} while training took {training_elapsed:?}"
    );
}

#[tokio::test]
async fn test_static_files_are_served_beside_the_api() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("api.js"), "function apiPost() {}").unwrap();
    let app = with_static_files(app(), dir.path());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"function apiPost() {}");

    // API routes still win over the directory
    assert_eq!(create_area(&app).await, 1);
    let (status, _) = get(&app, "/missing.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
