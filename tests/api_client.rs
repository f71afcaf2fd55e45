//! Wire-level tests for the API client against an in-process mock server.
//!
//! Each test builds the smallest axum router that can answer the calls it
//! exercises, binds it to an ephemeral port and points a real `ApiClient`
//! at it, so the request paths, query params, bodies and error envelopes
//! are checked as they actually go over the wire.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tawseel::api::{ApiClient, ApiError, OrderFilter};
use tawseel::models::{OrderStatus, ServiceType};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, token: Option<&str>) -> ApiClient {
    ApiClient::new(base_url, token, Duration::from_secs(5)).unwrap()
}

fn sample_user() -> Value {
    json!({
        "id": 1,
        "username": "admin",
        "full_name": "Shop Admin",
        "role": "admin",
        "phone": "07901112233",
        "is_active": true
    })
}

fn sample_order(id: i64) -> Value {
    json!({
        "id": id,
        "customer_name": "Ali Hassan",
        "customer_phone": "07901112233",
        "address": "Karrada, Baghdad",
        "service_type": "sale",
        "status": "in_delivery",
        "assigned_to": 4,
        "assigned_to_name": "Samir K",
        "details": {"product_name": "Laptop charger", "price": 25000.0},
        "created_at": "2026-02-10T08:30:00Z",
        "payments": [{"id": 1, "amount": 25000.0, "payment_date": "2026-02-11T12:00:00Z"}],
        "images": [{"id": 3, "image_path": "uploads/orders/12/photo.jpg"}]
    })
}

#[tokio::test]
async fn login_returns_session_and_surfaces_server_message() {
    let app = Router::new().route(
        "/auth/login",
        post(|Json(body): Json<Value>| async move {
            if body["username"] == "admin" && body["password"] == "s3cret" {
                (
                    StatusCode::OK,
                    Json(json!({"token": "tok-1", "user": sample_user()})),
                )
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "invalid credentials"})),
                )
            }
        }),
    );
    let base_url = serve(app).await;
    let api = client(&base_url, None);

    let session = api.login("admin", "s3cret").await.unwrap();
    assert_eq!(session.token, "tok-1");
    assert_eq!(session.user.username, "admin");

    // Bad credentials keep the server's wording instead of the
    // session-expired hint.
    let err = api.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "invalid credentials");
    assert!(!matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn rejected_token_maps_to_unauthorized() {
    let app = Router::new().route(
        "/orders/:id",
        get(|Path(id): Path<i64>| async move {
            if id == 12 {
                (StatusCode::OK, Json(sample_order(12))).into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "token expired"})),
                )
                    .into_response()
            }
        }),
    );
    let base_url = serve(app).await;
    let api = client(&base_url, Some("stale"));

    let order = api.get_order(12).await.unwrap();
    assert_eq!(order.payments.len(), 1);
    assert_eq!(order.images.len(), 1);
    assert_eq!(order.status, OrderStatus::InDelivery);

    let err = api.get_order(13).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(err.to_string().contains("tawseel login"));
}

#[tokio::test]
async fn list_orders_sends_only_set_filters() {
    let seen: Arc<Mutex<Option<HashMap<String, String>>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/orders",
            get(
                |State(seen): State<Arc<Mutex<Option<HashMap<String, String>>>>>,
                 Query(params): Query<HashMap<String, String>>| async move {
                    *seen.lock().unwrap() = Some(params);
                    Json(json!([]))
                },
            ),
        )
        .with_state(seen.clone());
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    let filter = OrderFilter {
        search: Some("ali".to_string()),
        service_type: Some(ServiceType::ReceiveForRepair),
        status: Some(OrderStatus::Assigned),
        courier_id: None,
        assigned_to: Some(4),
    };
    let orders = api.list_orders(&filter).await.unwrap();
    assert!(orders.is_empty());

    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(params.get("search").map(String::as_str), Some("ali"));
    assert_eq!(
        params.get("service_type").map(String::as_str),
        Some("receive_for_repair")
    );
    assert_eq!(params.get("status").map(String::as_str), Some("assigned"));
    assert_eq!(params.get("assigned_to").map(String::as_str), Some("4"));
    assert!(!params.contains_key("courier_id"));
}

#[tokio::test]
async fn lifecycle_writes_use_expected_paths_and_bodies() {
    let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;
    async fn record(State(seen): State<Seen>, Path(id): Path<i64>, path: &str, body: Value) {
        seen.lock().unwrap().push((format!("{}/{}", path, id), body));
    }

    let app = Router::new()
        .route(
            "/orders/:id/assign",
            post(|state: State<Seen>, path: Path<i64>, Json(body): Json<Value>| async move {
                record(state, path, "assign", body).await;
                StatusCode::OK
            }),
        )
        .route(
            "/orders/:id/status",
            post(|state: State<Seen>, path: Path<i64>, Json(body): Json<Value>| async move {
                record(state, path, "status", body).await;
                StatusCode::OK
            }),
        )
        .route(
            "/orders/:id/receive",
            post(|state: State<Seen>, path: Path<i64>| async move {
                record(state, path, "receive", Value::Null).await;
                StatusCode::OK
            }),
        )
        .route(
            "/orders/:id/payment",
            post(|state: State<Seen>, path: Path<i64>, Json(body): Json<Value>| async move {
                record(state, path, "payment", body).await;
                StatusCode::CREATED
            }),
        )
        .with_state(seen.clone());
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    api.assign_courier(12, 4).await.unwrap();
    api.update_status(12, OrderStatus::Delivered).await.unwrap();
    api.receive_order(12).await.unwrap();
    api.add_payment(12, 25000.0).await.unwrap();

    let calls = seen.lock().unwrap().clone();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].0, "assign/12");
    assert_eq!(calls[0].1, json!({"assigned_to": 4}));
    assert_eq!(calls[1].0, "status/12");
    assert_eq!(calls[1].1, json!({"status": "delivered"}));
    assert_eq!(calls[2].0, "receive/12");
    assert_eq!(calls[3].0, "payment/12");
    assert_eq!(calls[3].1, json!({"amount": 25000.0}));
}

#[tokio::test]
async fn signature_upload_posts_data_url() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/upload/signature/:id",
            post(
                |State(seen): State<Arc<Mutex<Option<Value>>>>,
                 Path(id): Path<i64>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(id, 5);
                    *seen.lock().unwrap() = Some(body);
                    StatusCode::CREATED
                },
            ),
        )
        .with_state(seen.clone());
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    api.upload_signature(5, "data:image/png;base64,AAAA".to_string())
        .await
        .unwrap();

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["signature_data"], "data:image/png;base64,AAAA");
}

#[tokio::test]
async fn image_upload_is_multipart_with_file_and_type() {
    type Parts = Arc<Mutex<Vec<(String, Option<String>, Option<String>, Vec<u8>)>>>;
    let seen: Parts = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/upload/order-image/:id",
            post(
                |State(seen): State<Parts>, Path(id): Path<i64>, mut multipart: Multipart| async move {
                    assert_eq!(id, 7);
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let content_type = field.content_type().map(str::to_string);
                        let bytes = field.bytes().await.unwrap().to_vec();
                        seen.lock()
                            .unwrap()
                            .push((name, file_name, content_type, bytes));
                    }
                    StatusCode::CREATED
                },
            ),
        )
        .with_state(seen.clone());
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    api.upload_image(
        7,
        "photo.jpg".to_string(),
        "image/jpeg",
        vec![0xFF, 0xD8, 0xFF],
        "device_condition",
    )
    .await
    .unwrap();

    let parts = seen.lock().unwrap().clone();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].0, "image");
    assert_eq!(parts[0].1.as_deref(), Some("photo.jpg"));
    assert_eq!(parts[0].2.as_deref(), Some("image/jpeg"));
    assert_eq!(parts[0].3, vec![0xFF, 0xD8, 0xFF]);
    assert_eq!(parts[1].0, "image_type");
    assert_eq!(parts[1].3, b"device_condition".to_vec());
}

#[tokio::test]
async fn download_image_resolves_relative_paths() {
    let app = Router::new().route(
        "/uploads/orders/7/photo.png",
        get(|| async { (StatusCode::OK, b"PNGDATA".to_vec()) }),
    );
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    let bytes = api.download_image("uploads/orders/7/photo.png").await.unwrap();
    assert_eq!(bytes, b"PNGDATA".to_vec());

    let bytes = api.download_image("/uploads/orders/7/photo.png").await.unwrap();
    assert_eq!(bytes, b"PNGDATA".to_vec());
}

#[tokio::test]
async fn bearer_token_rides_every_request() {
    let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/users",
            get(
                |State(seen): State<Arc<Mutex<Option<String>>>>, headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    *seen.lock().unwrap() = auth;
                    Json(json!([sample_user()]))
                },
            ),
        )
        .with_state(seen.clone());
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok-9"));

    let users = api.list_users(None).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(
        seen.lock().unwrap().clone().as_deref(),
        Some("Bearer tok-9")
    );
}

#[tokio::test]
async fn error_envelope_without_json_falls_back_to_status_text() {
    let app = Router::new().route(
        "/orders",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = serve(app).await;
    let api = client(&base_url, Some("tok"));

    let err = api.list_orders(&OrderFilter::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().contains("500"));
}
