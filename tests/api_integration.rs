//! Integration tests for the HTTP API
//!
//! Each test builds the full router over a temporary SQLite database and a
//! manually driven clock, then exercises it with `oneshot` requests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rideshare_backend::{
    api::{self, AppState},
    auth::{CredentialVerifier, ManualClock, SessionIssuer, TokenCodec},
    config::AuthConfig,
    store::RideStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    _db: NamedTempFile,
}

fn test_app() -> TestApp {
    let db = NamedTempFile::new().unwrap();
    let store = Arc::new(RideStore::new(db.path().to_str().unwrap()).unwrap());

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let config = AuthConfig::new("integration-secret".to_string(), "HS256", 60).unwrap();
    let codec = Arc::new(TokenCodec::with_clock(&config, clock.clone()));
    let state = AppState::new(
        store,
        Arc::new(SessionIssuer::new(codec.clone())),
        Arc::new(CredentialVerifier::new(codec)),
    );

    TestApp {
        router: api::router(state),
        clock,
        _db: db,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, challenge, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &TestApp, email: &str, phone: &str, user_type: &str) -> i64 {
    let (status, _, body) = send(
        app,
        json_request(
            "POST",
            "/users",
            None,
            json!({
                "email": email,
                "phone_number": phone,
                "password_hash": "pw-hash",
                "first_name": "Test",
                "last_name": "User",
                "user_type": user_type,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["user_id"].as_i64().unwrap()
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    let form = format!(
        "grant_type=password&username={}&password={}",
        email.replace('@', "%40"),
        password
    );
    Request::builder()
        .method("POST")
        .uri("/users/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

async fn login(app: &TestApp, email: &str) -> String {
    let (status, _, body) = send(app, login_request(email, "pw-hash")).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_db_check() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _, body) = send(&app, get_request("/test-db", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database_connection"], "successful");
}

#[tokio::test]
async fn test_admin_route_scope_gate() {
    let app = test_app();
    register(&app, "admin@example.com", "555-1000", "admin").await;
    register(&app, "rider@example.com", "555-1001", "rider").await;
    let admin = login(&app, "admin@example.com").await;
    let rider = login(&app, "rider@example.com").await;

    let (status, challenge, body) = send(&app, get_request("/admin/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer scope=\"admin\""));
    assert_eq!(body["detail"], "Could not validate credentials");

    let (status, _, body) = send(&app, get_request("/admin/users", Some(&rider))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Missing required scope: admin");

    let (status, _, body) = send(&app, get_request("/admin/users", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert!(body[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_failures_share_one_shape() {
    let app = test_app();
    register(&app, "rider@example.com", "555-1001", "rider").await;

    let unknown = send(&app, login_request("nobody@example.com", "pw-hash")).await;
    let wrong = send(&app, login_request("rider@example.com", "not-it")).await;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.2["detail"], "Invalid credentials");
}

#[tokio::test]
async fn test_forged_and_expired_tokens_are_unauthorized() {
    let app = test_app();
    let rider_id = register(&app, "rider@example.com", "555-1001", "rider").await;
    let rider = login(&app, "rider@example.com").await;

    // Signed with another secret, presented to a route needing a scope it does claim
    let forger = TokenCodec::new(&AuthConfig::new("other".to_string(), "HS256", 60).unwrap());
    let forged = forger
        .encode(
            &rideshare_backend::auth::models::ClaimSet {
                user_id: rider_id,
                email: "rider@example.com".to_string(),
                role: "admin".to_string(),
                scopes: rideshare_backend::auth::scopes::scope_set(["admin"]),
            },
            None,
        )
        .unwrap();
    let (status, _, _) = send(&app, get_request("/admin/users", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Expired: even a scope mismatch reports 401
    app.clock.advance(Duration::minutes(61));
    let (status, _, _) = send(&app, get_request("/admin/users", Some(&rider))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ride_flow_with_ownership_checks() {
    let app = test_app();
    register(&app, "admin@example.com", "555-1000", "admin").await;
    let rider_id = register(&app, "rider@example.com", "555-1001", "rider").await;
    let driver_id = register(&app, "driver@example.com", "555-1002", "driver").await;
    let admin = login(&app, "admin@example.com").await;
    let rider = login(&app, "rider@example.com").await;
    let driver = login(&app, "driver@example.com").await;

    // Verification needs a vehicle first
    let verify_uri = format!("/drivers/{}/verify", driver_id);
    let verify = || json_request("POST", &verify_uri, Some(&admin), json!({}));
    let (status, _, body) = send(&app, verify()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/drivers/{}/vehicles", driver_id),
            None,
            json!({ "make": "Kia", "model": "Niro", "plate_number": "RIDE-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(&app, verify()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_status"], "available");

    let ride_body = |rider_id: i64| {
        json!({
            "rider_id": rider_id,
            "pickup_location": { "latitude": 40.71, "longitude": -74.0 },
            "dropoff_location": { "latitude": 40.75, "longitude": -73.98 },
            "pickup_address": "1 Main St",
            "dropoff_address": "99 Broadway",
        })
    };

    // Drivers hold no rider scope
    let (status, _, _) = send(
        &app,
        json_request("POST", "/rides", Some(&driver), ride_body(rider_id)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = send(
        &app,
        json_request("POST", "/rides", Some(&rider), ride_body(rider_id + 100)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Cannot request ride for another user");

    let (status, _, body) = send(
        &app,
        json_request("POST", "/rides", Some(&rider), ride_body(rider_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["ride"]["ride_status"], "requested");
    assert_eq!(body["matched_drivers"][0]["driver_id"], driver_id);
    let ride_id = body["ride"]["ride_id"].as_i64().unwrap();

    let accept_uri = format!("/rides/{}/accept", ride_id);
    let (status, _, _) = send(
        &app,
        json_request("POST", &accept_uri, Some(&driver), json!({ "driver_id": driver_id + 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = send(
        &app,
        json_request("POST", &accept_uri, Some(&driver), json!({ "driver_id": driver_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["ride_status"], "accepted");

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/rides/{}/complete", ride_id),
            None,
            json!({ "actual_fare": 23.75 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let payment_uri = format!("/payments/{}", ride_id);
    let (status, _, body) = send(&app, get_request(&payment_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "pending");

    let (status, _, body) = send(
        &app,
        json_request("PUT", &payment_uri, None, json!({ "payment_status": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "paid");

    let (status, _, body) = send(
        &app,
        get_request(&format!("/users/{}/rides/completed", rider_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_registration_and_missing_records() {
    let app = test_app();
    register(&app, "rider@example.com", "555-1001", "rider").await;

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/users",
            None,
            json!({
                "email": "rider@example.com",
                "phone_number": "555-9999",
                "password_hash": "x",
                "first_name": "A",
                "last_name": "B",
                "user_type": "rider",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email address is already registered");

    let (status, _, _) = send(&app, get_request("/users/9999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, get_request("/payments/9999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        json_request(
            "PATCH",
            "/rides/9999/cancel",
            None,
            json!({ "cancelled_by": "rider" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
