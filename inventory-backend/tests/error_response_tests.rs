use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use inventory_backend::{
    config::{AppEnv, Config},
    create_app,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tower::ServiceExt;

/// Helper to create test database
async fn setup_test_db() -> inventory_db::Database {
    inventory_db::Database::open_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

fn app_for(db: inventory_db::Database, app_env: AppEnv) -> axum::Router {
    let config = Config {
        app_env,
        ..Config::default()
    };
    create_app(db, &config)
}

/// Helper to send a raw body and get the parsed response
async fn send_raw(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: &'static str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .extension(ConnectInfo(SocketAddr::from(([198, 51, 100, 20], 40000))))
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();

    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

#[tokio::test]
async fn test_error_response_format_for_bad_credentials() {
    // GIVEN: An empty database
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: Logging in as nobody
    let (status, body) = send_raw(
        app,
        "POST",
        "/api/auth/login",
        r#"{"username":"ghost","password":"whatever"}"#,
    )
    .await;

    // THEN: Should return 401 with exactly one error field
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let obj = body.as_object().expect("Response should be a JSON object");
    assert_eq!(obj.len(), 1, "Error body should only carry 'error'");
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: Posting a body that is not valid JSON
    let (status, body) = send_raw(app, "POST", "/api/auth/register", "{not json").await;

    // THEN: Should return 400 with the JSON error envelope
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "Response should have 'error' field");
}

#[tokio::test]
async fn test_wrong_field_type_is_validation_error() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: Sending a number where a string is expected
    let (status, body) = send_raw(
        app,
        "POST",
        "/api/auth/register",
        r#"{"username":42,"email":"a@example.com","password":"hunter22"}"#,
    )
    .await;

    // THEN: Should return 400, not 422
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unauthorized_error_does_not_leak_details() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: Sending a garbage bearer token
    let request = Request::builder()
        .uri("/api/servers")
        .header("Authorization", "Bearer abc.def.ghi")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // THEN: Should return the generic token message
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "Invalid or expired token" }));
}

#[tokio::test]
async fn test_security_headers_present() {
    // GIVEN: A development app
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: Hitting any route
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // THEN: Standard security headers are set, HSTS is not
    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_XSS_PROTECTION], "1; mode=block");
    assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

#[tokio::test]
async fn test_hsts_only_in_production() {
    // GIVEN: A production app
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Production);

    // WHEN: Hitting any route
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // THEN: HSTS is set
    assert_eq!(
        response.headers()[header::STRICT_TRANSPORT_SECURITY],
        "max-age=31536000; includeSubDomains; preload"
    );
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    // GIVEN: A development app
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Development);

    // WHEN: A browser preflights from the Vite dev server
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/servers")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // THEN: The origin is echoed and credentials are allowed
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    // GIVEN: A production app with the default allow list
    let db = setup_test_db().await;
    let app = app_for(db, AppEnv::Production);

    // WHEN: A request arrives from an origin not on the list
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // THEN: No allow-origin header is returned
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

/// Posts an oversized register body, optionally declaring its length up front
async fn send_oversized(declare_length: bool) -> (StatusCode, Value) {
    let db = setup_test_db().await;
    let config = Config {
        request_body_limit: 64,
        ..Config::default()
    };
    let app = create_app(db, &config);

    let body = format!(r#"{{"username":"{}"}}"#, "a".repeat(200));
    let mut builder = Request::builder()
        .uri("/api/auth/register")
        .method("POST")
        .extension(ConnectInfo(SocketAddr::from(([198, 51, 100, 20], 40000))))
        .header("Content-Type", "application/json");
    if declare_length {
        builder = builder.header(header::CONTENT_LENGTH, body.len());
    }

    let response = app
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(json!({})))
}

#[tokio::test]
async fn test_oversized_body_with_content_length_uses_error_envelope() {
    // WHEN: The declared length exceeds the limit
    let (status, body) = send_oversized(true).await;

    // THEN: 413 with the JSON envelope
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));
}

#[tokio::test]
async fn test_oversized_streamed_body_uses_error_envelope() {
    // WHEN: The body overruns the limit while being read
    let (status, body) = send_oversized(false).await;

    // THEN: 413 with the JSON envelope, not a 400
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));
}
