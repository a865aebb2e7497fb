// tests/api_quakes.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/quakes with known, unknown, repeated and missing range
// - upstream failure degrades to an empty list with 200

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Number, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use quake_alerts::api::{self, AppState};
use quake_alerts::feed::FeedEvent;
use quake_alerts::testing::ScriptedFeed;
use quake_alerts::FeedRange;

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(feed: Arc<ScriptedFeed>) -> Router {
    api::create_router(AppState::new(feed))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router(Arc::new(ScriptedFeed::new()));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn week_range_republishes_four_fields_in_order() {
    let feed = Arc::new(ScriptedFeed::new());
    feed.push_ok(vec![
        FeedEvent {
            id: "a".into(),
            place: Some("P1".into()),
            magnitude: Number::from_f64(2.1),
            time: 1,
        },
        FeedEvent {
            id: "b".into(),
            place: Some("P2".into()),
            magnitude: None,
            time: 2,
        },
    ]);
    let (status, v) = get_json(test_router(feed.clone()), "/api/quakes?range=week").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        v,
        json!({"quakes":[
            {"id":"a","place":"P1","mag":2.1,"time":1},
            {"id":"b","place":"P2","mag":null,"time":2}
        ]})
    );
    assert_eq!(feed.requested(), vec![FeedRange::Week]);
}

#[tokio::test]
async fn n_features_give_n_entries_with_only_four_keys() {
    let feed = Arc::new(ScriptedFeed::new());
    let events: Vec<FeedEvent> = (0..25)
        .map(|i| FeedEvent {
            id: format!("ev{i}"),
            place: Some(format!("place {i}")),
            magnitude: Number::from_f64(i as f64 / 10.0),
            time: 1_700_000_000_000 - i,
        })
        .collect();
    feed.push_ok(events);

    let (status, v) = get_json(test_router(feed), "/api/quakes?range=month").await;
    assert_eq!(status, StatusCode::OK);

    let quakes = v["quakes"].as_array().expect("quakes array");
    assert_eq!(quakes.len(), 25);
    for (i, q) in quakes.iter().enumerate() {
        let obj = q.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "mag", "place", "time"]);
        assert_eq!(obj["id"], format!("ev{i}"));
    }
}

#[tokio::test]
async fn unknown_or_missing_range_is_empty_200_without_fetching() {
    for uri in [
        "/api/quakes",
        "/api/quakes?range=",
        "/api/quakes?range=day",
        "/api/quakes?range=HOUR",
        "/api/quakes?other=hour",
        "/api/quakes?range=week&range=hour",
    ] {
        let feed = Arc::new(ScriptedFeed::new());
        let (status, v) = get_json(test_router(feed.clone()), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(v, json!({"quakes": []}), "{uri}");
        assert!(feed.requested().is_empty(), "{uri} should not hit upstream");
    }
}

#[tokio::test]
async fn upstream_failure_is_empty_200() {
    let feed = Arc::new(ScriptedFeed::new());
    feed.push_status(502);
    feed.push_malformed();

    let app = test_router(feed.clone());
    let (s1, v1) = get_json(app.clone(), "/api/quakes?range=hour").await;
    let (s2, v2) = get_json(app, "/api/quakes?range=hour").await;

    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    assert_eq!(v1, json!({"quakes": []}));
    assert_eq!(v2, json!({"quakes": []}));
    // Every request goes upstream; nothing is cached.
    assert_eq!(feed.requested().len(), 2);
}

#[tokio::test]
async fn missing_place_serializes_as_null() {
    let feed = Arc::new(ScriptedFeed::new());
    feed.push_ok(vec![FeedEvent {
        id: "x".into(),
        place: None,
        magnitude: Number::from_f64(1.0),
        time: 9,
    }]);
    let (_, v) = get_json(test_router(feed), "/api/quakes?range=hour").await;
    assert_eq!(v, json!({"quakes":[{"id":"x","place":null,"mag":1.0,"time":9}]}));
}

#[tokio::test]
async fn integer_magnitude_is_republished_without_fraction() {
    let feed = Arc::new(ScriptedFeed::new());
    feed.push_ok(vec![FeedEvent {
        id: "int".into(),
        place: Some("P".into()),
        magnitude: Some(Number::from(2)),
        time: 3,
    }]);
    let req = Request::builder()
        .uri("/api/quakes?range=hour")
        .body(Body::empty())
        .unwrap();
    let resp = test_router(feed).oneshot(req).await.unwrap();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let text = std::str::from_utf8(&bytes).unwrap();
    assert!(text.contains(r#""mag":2,"#), "{text}");
}
