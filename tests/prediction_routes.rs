//! End-to-end tests for the JSON prediction routes.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod common;

const FERTILITY_REPLY: &str = r#"{"prediction":"Medium","confidence":0.82}"#;

#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    request_ids: Arc<Mutex<Vec<String>>>,
}

async fn record_and_reply(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    rec.hits.fetch_add(1, Ordering::SeqCst);
    rec.bodies.lock().unwrap().push(body);
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        rec.request_ids.lock().unwrap().push(id.to_string());
    }
    ([(CONTENT_TYPE, "application/json")], FERTILITY_REPLY)
}

fn recording_upstream(rec: Recorder) -> Router {
    Router::new()
        .route("/predict/fertility", post(record_and_reply))
        .route("/predict/irrigation", post(record_and_reply))
        .with_state(rec)
}

#[tokio::test]
async fn test_fertility_body_passes_through_both_ways() {
    let rec = Recorder::default();
    let upstream = common::start_stub_upstream(recording_upstream(rec.clone())).await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;

    let sent = common::fertility_sample();
    let res = common::client()
        .post(format!("http://{}/api/crops/fertility", gateway))
        .json(&sent)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), FERTILITY_REPLY);

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0], sent, "fields must arrive unrenamed and uncoerced");

    shutdown.trigger();
}

#[tokio::test]
async fn test_moisture_forwards_to_irrigation_endpoint() {
    let rec = Recorder::default();
    let upstream = common::start_stub_upstream(recording_upstream(rec.clone())).await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;

    let sent = common::irrigation_sample();
    let res = common::client()
        .post(format!("http://{}/api/crops/moisture", gateway))
        .json(&sent)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(rec.bodies.lock().unwrap()[0], sent);

    shutdown.trigger();
}

#[tokio::test]
async fn test_refused_connection_maps_to_503() {
    let upstream = common::refused_addr().await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;

    let res = common::client()
        .post(format!("http://{}/api/crops/moisture", gateway))
        .json(&common::irrigation_sample())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Cannot connect to ML service");
    assert!(body["details"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn test_refused_first_connection_recovers_on_retry() {
    let rec = Recorder::default();
    let upstream = common::refused_addr().await;

    let mut config = common::test_config(upstream);
    config.retries.max_attempts = 5;
    config.retries.base_delay_ms = 150;
    config.retries.max_delay_ms = 150;
    let (gateway, shutdown) = common::start_gateway(config).await;

    // The first attempt is refused; the upstream comes up before the retry.
    let app = recording_upstream(rec.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        common::start_stub_upstream_on(upstream, app).await;
    });

    let res = common::client()
        .post(format!("http://{}/api/crops/fertility", gateway))
        .json(&common::fertility_sample())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), FERTILITY_REPLY);
    assert_eq!(rec.hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_refused_connection_stops_after_max_attempts() {
    let upstream = common::refused_addr().await;

    let mut config = common::test_config(upstream);
    config.retries.max_attempts = 3;
    config.retries.base_delay_ms = 200;
    config.retries.max_delay_ms = 200;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let started = Instant::now();
    let res = common::client()
        .post(format!("http://{}/api/crops/fertility", gateway))
        .json(&common::fertility_sample())
        .send()
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    // Two backoff sleeps of 200-220 ms; a fourth attempt would add another.
    assert!(elapsed >= Duration::from_millis(400), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_times_out_with_retry_hint() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/predict/fertility",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                FERTILITY_REPLY
            }
        }),
    );
    let upstream = common::start_stub_upstream(app).await;

    let mut config = common::test_config(upstream);
    config.upstream.fertility_timeout_ms = 300;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let started = Instant::now();
    let res = common::client()
        .post(format!("http://{}/api/crops/fertility", gateway))
        .json(&common::fertility_sample())
        .send()
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);

    let body: Value = res.json().await.unwrap();
    assert!(body["details"].as_str().unwrap().contains("retry"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1, "timed-out call must not be re-sent");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_status_and_body_relayed() {
    const UPSTREAM_ERROR: &str = r#"{"error":"Missing EC"}"#;
    let app = Router::new().route(
        "/predict/fertility",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                [(CONTENT_TYPE, "application/json")],
                UPSTREAM_ERROR,
            )
        }),
    );
    let upstream = common::start_stub_upstream(app).await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;

    let res = common::client()
        .post(format!("http://{}/api/crops/fertility", gateway))
        .json(&serde_json::json!({ "N": 280 }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), UPSTREAM_ERROR);

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_body_rejected_locally() {
    let rec = Recorder::default();
    let upstream = common::start_stub_upstream(recording_upstream(rec.clone())).await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{}/api/crops/fertility", gateway);

    let empty_object = client.post(&url).json(&serde_json::json!({})).send().await.unwrap();
    assert_eq!(empty_object.status(), StatusCode::BAD_REQUEST);
    let body: Value = empty_object.json().await.unwrap();
    assert!(body["error"].is_string());

    let no_body = client.post(&url).send().await.unwrap();
    assert_eq!(no_body.status(), StatusCode::BAD_REQUEST);

    let garbage = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .body("N=280")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    let body: Value = garbage.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(rec.hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_echoed_and_forwarded() {
    let rec = Recorder::default();
    let upstream = common::start_stub_upstream(recording_upstream(rec.clone())).await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/crops/fertility", gateway))
        .header("x-request-id", "req-42")
        .json(&common::fertility_sample())
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");
    assert_eq!(rec.request_ids.lock().unwrap().as_slice(), ["req-42".to_string()]);

    let res = client.get(format!("http://{}/", gateway)).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    shutdown.trigger();
}

#[tokio::test]
async fn test_root_descriptor_and_unknown_routes() {
    let upstream = common::refused_addr().await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();

    let root: Value = client
        .get(format!("http://{}/", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "running");
    assert_eq!(root["endpoints"]["crops"], "/api/crops/*");
    assert_eq!(root["endpoints"]["health"], "/api/health");

    let missing = client
        .get(format!("http://{}/api/crops/unknown", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["path"], "/api/crops/unknown");

    shutdown.trigger();
}

#[tokio::test]
async fn test_cors_allow_list() {
    let upstream = common::refused_addr().await;
    let (gateway, shutdown) = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{}/", gateway);

    let allowed = client
        .get(&url)
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );

    let blocked = client
        .get(&url)
        .header("origin", "https://evil.example")
        .send()
        .await
        .unwrap();
    assert!(blocked.headers().get("access-control-allow-origin").is_none());

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("http://{}/api/crops/fertility", gateway))
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(
        preflight.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );

    shutdown.trigger();
}
