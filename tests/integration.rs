use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_service::api::rest::router;
use courier_service::db::MemoryDb;
use courier_service::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(Arc::new(MemoryDb::new()))))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn rpc(app: &axum::Router, pattern: &str, data: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(post_json("/rpc", json!({ "pattern": pattern, "data": data })))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn event(app: &axum::Router, pattern: &str, data: Value) -> StatusCode {
    app.clone()
        .oneshot(post_json("/events", json!({ "pattern": pattern, "data": data })))
        .await
        .unwrap()
        .status()
}

async fn create(app: &axum::Router, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let (status, _) = rpc(
        app,
        "createCourier",
        json!({ "id": id, "email": email, "vehicleType": "MOTORCYCLE" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    create(&app, "metrics@example.com").await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("messages_total"));
}

#[tokio::test]
async fn create_courier_returns_courier() {
    let app = setup();
    let id = Uuid::new_v4();
    let (status, body) = rpc(
        &app,
        "createCourier",
        json!({ "id": id, "email": "alice@example.com", "vehicleType": "BICYCLE" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["vehicleType"], "BICYCLE");
    assert_eq!(body["availability"], true);
    assert!(body["orderAssigned"].is_null());

    let (status, fetched) = rpc(&app, "findOneCourier", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn duplicate_email_returns_409_and_keeps_original() {
    let app = setup();
    let original = create(&app, "dup@example.com").await;

    let (status, body) = rpc(
        &app,
        "createCourier",
        json!({ "id": Uuid::new_v4(), "email": "dup@example.com", "vehicleType": "VAN" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert_eq!(body["message"], "Courier with email dup@example.com already exists");

    let (_, fetched) = rpc(&app, "findOneCourier", json!({ "id": original })).await;
    assert_eq!(fetched["vehicleType"], "MOTORCYCLE");
}

#[tokio::test]
async fn invalid_payload_returns_400() {
    let app = setup();
    let (status, body) = rpc(
        &app,
        "createCourier",
        json!({ "id": "abc", "email": "alice@example.com", "vehicleType": "SKATEBOARD" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("id must be a UUID"));
    assert!(message.contains("vehicleType must be one of the following values"));
}

#[tokio::test]
async fn malformed_envelope_returns_400() {
    let app = setup();
    let response = app
        .oneshot(post_json("/rpc", json!({ "data": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_pattern_returns_404() {
    let app = setup();
    let (status, _) = rpc(&app, "findAllOrders", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// An empty table is reported as 404, not as an empty page.
#[tokio::test]
async fn find_all_on_empty_table_returns_404() {
    let app = setup();
    let (status, body) = rpc(&app, "findAllCouriers", json!({ "page": 1, "limit": 10 })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No couriers found.");
}

#[tokio::test]
async fn find_all_paginates_with_meta() {
    let app = setup();
    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(create(&app, &format!("c{n}@example.com")).await);
    }

    let (status, body) = rpc(&app, "findAllCouriers", json!({ "page": 1, "limit": 2 })).await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], ids[0].to_string());
    assert_eq!(data[1]["id"], ids[1].to_string());
    assert_eq!(body["meta"], json!({ "total": 5, "page": 1, "lastPage": 3 }));
}

#[tokio::test]
async fn find_one_unknown_returns_404() {
    let app = setup();
    let id = Uuid::new_v4();
    let (status, body) = rpc(&app, "findOneCourier", json!({ "id": id })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("Courier #{id} not found"));
}

#[tokio::test]
async fn update_courier_changes_given_fields() {
    let app = setup();
    let id = create(&app, "eve@example.com").await;

    let (status, body) = rpc(
        &app,
        "updateCourier",
        json!({ "id": id, "email": "eve@courier.example.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "eve@courier.example.com");
    assert_eq!(body["vehicleType"], "MOTORCYCLE");
}

#[tokio::test]
async fn update_unknown_returns_404_without_writing() {
    let app = setup();
    create(&app, "only@example.com").await;

    let (status, _) = rpc(
        &app,
        "updateCourier",
        json!({ "id": Uuid::new_v4(), "vehicleType": "CAR" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = rpc(&app, "findAllCouriers", json!({})).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["vehicleType"], "MOTORCYCLE");
}

#[tokio::test]
async fn availability_toggles_back_and_forth() {
    let app = setup();
    let id = create(&app, "flip@example.com").await;

    let (_, first) = rpc(&app, "updateCourierAvailability", json!({ "id": id })).await;
    assert_eq!(first["availability"], false);

    let (_, second) = rpc(&app, "updateCourierAvailability", json!({ "id": id })).await;
    assert_eq!(second["availability"], true);
}

#[tokio::test]
async fn assignment_events_set_and_clear_order() {
    let app = setup();
    let id = create(&app, "runner@example.com").await;

    let status = event(
        &app,
        "courier_assigned",
        json!({ "order": { "id": "ord-100" }, "courierId": id }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, body) = rpc(&app, "findOneCourier", json!({ "id": id })).await;
    assert_eq!(body["orderAssigned"], "ord-100");

    let status = event(
        &app,
        "order_delivered",
        json!({ "orderId": "ord-100", "courierId": id }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, body) = rpc(&app, "findOneCourier", json!({ "id": id })).await;
    assert!(body["orderAssigned"].is_null());
}

#[tokio::test]
async fn events_never_report_failures_to_the_publisher() {
    let app = setup();

    let unknown_courier = event(
        &app,
        "courier_assigned",
        json!({ "order": { "id": "ord-1" }, "courierId": Uuid::new_v4() }),
    )
    .await;
    let malformed = event(&app, "order_delivered", json!({ "orderId": "ord-1" })).await;
    let unknown_pattern = event(&app, "order_cancelled", json!({})).await;

    assert_eq!(unknown_courier, StatusCode::ACCEPTED);
    assert_eq!(malformed, StatusCode::ACCEPTED);
    assert_eq!(unknown_pattern, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn delete_removes_courier() {
    let app = setup();
    let id = create(&app, "bye@example.com").await;

    let (status, body) = rpc(&app, "deleteCourier", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());

    let (status, _) = rpc(&app, "findOneCourier", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = rpc(&app, "deleteCourier", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
