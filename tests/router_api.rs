//! HTTP surface checks: probes, the login gate, and a round driven through
//! the JSON API with a bearer token.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;
use transfer_desk::auth::{Credentials, SessionStore};
use transfer_desk::router::{transfer_router, AppState};
use transfer_desk::transfers::{InMemoryRoundStore, TransferService};

fn build_router() -> Router {
    // A standalone recorder keeps tests from fighting over the global one.
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let layer = PrometheusMetricLayer::new();

    let state = AppState {
        service: TransferService::new(Arc::new(InMemoryRoundStore::new())),
        sessions: Arc::new(SessionStore::new(
            Credentials {
                username: "admin".to_string(),
                password: "letmein".to_string(),
            },
            8,
        )),
        readiness: Arc::new(AtomicBool::new(true)),
        metrics: handle,
    };
    transfer_router(state, layer)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("request")
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "username": "admin", "password": "letmein" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    payload
        .get("token")
        .and_then(|token| token.as_str())
        .expect("token issued")
        .to_string()
}

#[tokio::test]
async fn healthcheck_is_open() {
    let router = build_router();
    let response = router
        .oneshot(get_request("/health", None))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload.get("status"), Some(&json!("ok")));
}

#[tokio::test]
async fn api_routes_require_a_bearer_token() {
    let router = build_router();
    let response = router
        .clone()
        .oneshot(get_request("/api/v1/rounds", None))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(get_request("/api/v1/rounds", Some("sess-bogus")))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let router = build_router();
    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "username": "admin", "password": "nope" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn round_lifecycle_over_http() {
    let router = build_router();
    let token = login(&router).await;

    // Open the general round for 2026.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rounds",
            Some(&token),
            json!({ "kind": "general", "year": 2026 }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);
    let summary = body_json(response).await;
    assert_eq!(summary.get("key"), Some(&json!("general_2026")));

    // Opening it twice conflicts.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rounds",
            Some(&token),
            json!({ "kind": "general", "year": 2026 }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Add one nurse and read her back through the cadre listing.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rounds/general_2026/cadre",
            Some(&token),
            json!({
                "pen": "700010",
                "name": "REMYA V",
                "designation": "JPHN Gr I",
                "institution": "PHC Kattakada",
                "district": "Thiruvananthapuram",
                "entry_date": "2014-06-02",
                "retirement_date": null,
                "district_join_date": "2019-05-20",
                "contact": "9447000010",
                "weightage": null
            }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(get_request(
            "/api/v1/rounds/general_2026/cadre?district=Thiruvananthapuram",
            Some(&token),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let cadre = body_json(response).await;
    assert_eq!(cadre.as_array().map(Vec::len), Some(1));

    // Mark her applied and check the dashboard counters.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rounds/general_2026/applications",
            Some(&token),
            json!([{ "pen": "700010", "preferences": ["Kollam", "Alappuzha"] }]),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get_request(
            "/api/v1/rounds/general_2026/dashboard",
            Some(&token),
        ))
        .await
        .expect("router dispatch");
    let stats = body_json(response).await;
    assert_eq!(stats.get("roster"), Some(&json!(1)));
    assert_eq!(stats.get("applied"), Some(&json!(1)));
    assert_eq!(stats.get("filled"), Some(&json!(0)));

    // Run auto-fill and fetch the draft export.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rounds/general_2026/draft/autofill",
            Some(&token),
            json!({ "enable_against": false }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(
        outcome.pointer("/tally/total").and_then(Value::as_u64),
        Some(1)
    );

    let response = router
        .clone()
        .oneshot(get_request(
            "/api/v1/rounds/general_2026/export/draft.csv",
            Some(&token),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let csv = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(csv.starts_with("PEN,Name,Institution,From District,To District"));
    assert!(csv.contains("700010"));
}

#[tokio::test]
async fn unknown_round_and_bad_key_are_reported() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(get_request(
            "/api/v1/rounds/general_2031/dashboard",
            Some(&token),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(get_request(
            "/api/v1/rounds/winter_olympics/dashboard",
            Some(&token),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/logout",
            Some(&token),
            json!({}),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload.get("revoked"), Some(&json!(true)));

    let response = router
        .oneshot(get_request("/api/v1/rounds", Some(&token)))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
