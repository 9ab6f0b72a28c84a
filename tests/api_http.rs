// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /evaluate  (trigger response shape)
// - GET /status/latest  (before and after a run, and from a store written elsewhere)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use chrono::TimeZone;
use object_store::{memory::InMemory, ObjectStore};

use feed_sla_monitor::persist::ObjectStoreSink;
use feed_sla_monitor::sla::RuleRegistry;
use feed_sla_monitor::{router, AppState, ObservedDelivery, SlaEngine};

mod common;
use common::{FixedDiscovery, MemorySink, RecordingAlerts};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_state() -> AppState {
    let discovery = FixedDiscovery::new().with(
        "staging/payments/",
        ObservedDelivery::at(chrono::Utc::now(), "staging/payments/now.csv"),
    );
    let engine = SlaEngine::new(
        Arc::new(RuleRegistry::default_seed()),
        chrono_tz::America::New_York,
        Arc::new(discovery),
        Arc::new(MemorySink::new()),
        Arc::new(RecordingAlerts::new()),
    );
    AppState::new(engine)
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app: Router = router(test_state());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes).trim(), "OK");
}

#[tokio::test]
async fn latest_is_empty_before_first_run() {
    let app = router(test_state());
    let resp = app
        .oneshot(Request::get("/status/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert!(v["check_time"].is_null());
    assert_eq!(v["results"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn evaluate_returns_trigger_response_and_updates_latest() {
    let app = router(test_state());

    let resp = app
        .clone()
        .oneshot(
            Request::post("/evaluate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"source":"aws.events","detail-type":"Scheduled Event"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["status_code"], 200);
    let body = v["body"].as_array().expect("body array");
    let sources: Vec<_> = body.iter().filter_map(|r| r["source"].as_str()).collect();
    assert_eq!(sources, vec!["orders", "payments", "products"]);
    for r in body {
        assert!(r["check_time_utc"].is_string(), "{r}");
        assert!(r["check_time_local"].is_string(), "{r}");
        assert!(r["freshness_score"].is_u64(), "{r}");
    }
    assert_eq!(body[0]["status"], "missing");
    assert_eq!(body[0]["freshness_score"], 0);
    assert_eq!(body[2]["freshness_score"], 50);

    let resp = app
        .oneshot(Request::get("/status/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let latest = read_json(resp).await;
    assert!(latest["check_time"].is_string());
    assert_eq!(latest["results"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn evaluate_accepts_empty_body() {
    let app = router(test_state());
    let resp = app
        .oneshot(Request::post("/evaluate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["body"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn latest_reads_results_persisted_before_startup() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let check = chrono::Utc.with_ymd_and_hms(2025, 6, 11, 14, 30, 0).unwrap();

    // Another process (e.g. the one-shot CLI) wrote these results earlier.
    let seeded = SlaEngine::new(
        Arc::new(RuleRegistry::default_seed()),
        chrono_tz::America::New_York,
        Arc::new(FixedDiscovery::new()),
        Arc::new(ObjectStoreSink::new(store.clone())),
        Arc::new(RecordingAlerts::new()),
    )
    .run_at(check)
    .await;

    let fresh = SlaEngine::new(
        Arc::new(RuleRegistry::default_seed()),
        chrono_tz::America::New_York,
        Arc::new(FixedDiscovery::new()),
        Arc::new(ObjectStoreSink::new(store)),
        Arc::new(RecordingAlerts::new()),
    );
    let app = router(AppState::new(fresh));

    let resp = app
        .oneshot(Request::get("/status/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["check_time"], "2025-06-11T14:30:00Z");
    let results: Vec<feed_sla_monitor::EvaluationResult> =
        serde_json::from_value(v["results"].clone()).unwrap();
    assert_eq!(results, seeded.results);
}
