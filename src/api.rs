use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use metrics::counter;
use serde::Serialize;
use serde_json::Number;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::feed::{self, FeedEvent, FeedSource};

#[derive(Clone)]
pub struct AppState {
    feeds: Arc<dyn FeedSource>,
}

impl AppState {
    pub fn new(feeds: Arc<dyn FeedSource>) -> Self {
        Self { feeds }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/quakes", get(quakes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias kept so callers can write `quake_alerts::router(state)`.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

/// One republished event. Exactly these four fields go over the wire.
#[derive(Debug, Serialize)]
pub struct Quake {
    pub id: String,
    pub place: Option<String>,
    pub mag: Option<Number>,
    pub time: i64,
}

impl From<FeedEvent> for Quake {
    fn from(ev: FeedEvent) -> Self {
        Self {
            id: ev.id,
            place: ev.place,
            mag: ev.magnitude,
            time: ev.time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuakesResp {
    pub quakes: Vec<Quake>,
}

/// The selector, only when `range` appears exactly once; a repeated key is
/// no single range and resolves to nothing.
fn single_range(params: &[(String, String)]) -> Option<&str> {
    let mut values = params.iter().filter(|(k, _)| k == "range");
    match (values.next(), values.next()) {
        (Some((_, v)), None) => Some(v.as_str()),
        _ => None,
    }
}

/// `GET /api/quakes?range=hour|week|month`. Always 200; an unknown range or
/// an upstream failure both answer `{"quakes":[]}`.
async fn quakes(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<QuakesResp> {
    let selector = single_range(&params);
    let outcome = feed::fetch_or_empty(state.feeds.as_ref(), selector).await;

    counter!("gateway_requests_total").increment(1);
    if outcome.is_fallback() {
        counter!("gateway_fallbacks_total").increment(1);
        tracing::debug!(range = ?selector, "serving empty quake list");
    }

    Json(QuakesResp {
        quakes: outcome.into_events().into_iter().map(Quake::from).collect(),
    })
}
