// src/feed/mod.rs
pub mod registry;
pub mod usgs;

use metrics::counter;
use serde::Deserialize;
use serde_json::Number;

use crate::error::FeedError;
pub use registry::{FeedRange, FeedRegistry};

/// One upstream earthquake record, reduced to the fields we consume.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FeedEvent {
    pub id: String,
    pub place: Option<String>,
    /// Kept as the upstream JSON number so `2` is republished as `2`, not `2.0`.
    pub magnitude: Option<Number>,
    /// Epoch milliseconds.
    pub time: i64,
}

/// Events from one fetch of one feed URL, in upstream order (most recent first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub events: Vec<FeedEvent>,
}

impl FeedSnapshot {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self { events }
    }

    /// The head event. Upstream ordering is trusted, never re-sorted.
    pub fn head(&self) -> Option<&FeedEvent> {
        self.events.first()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, range: FeedRange) -> Result<FeedSnapshot, FeedError>;
    fn name(&self) -> &'static str;
}

// --- GeoJSON summary shape (only the consumed subset) ---

#[derive(Debug, Deserialize)]
struct GeoJsonSummary {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    mag: Option<Number>,
    time: i64,
}

impl From<Feature> for FeedEvent {
    fn from(f: Feature) -> Self {
        Self {
            id: f.id,
            place: f.properties.place,
            magnitude: f.properties.mag,
            time: f.properties.time,
        }
    }
}

/// Decode a GeoJSON summary body. Extra fields are ignored. A body without a
/// `features` array is a decode error; a single feature lacking `id` or
/// `time` is skipped and the rest are kept.
pub fn parse_geojson(body: &[u8]) -> Result<FeedSnapshot, FeedError> {
    let summary: GeoJsonSummary = serde_json::from_slice(body)?;

    let mut events = Vec::with_capacity(summary.features.len());
    for (index, raw) in summary.features.into_iter().enumerate() {
        match serde_json::from_value::<Feature>(raw) {
            Ok(f) => events.push(FeedEvent::from(f)),
            Err(e) => {
                counter!("feed_features_skipped_total").increment(1);
                tracing::warn!(index, error = %e, "skipping malformed feed feature");
            }
        }
    }
    Ok(FeedSnapshot::new(events))
}

/// Why the gateway answered with an empty list instead of upstream data.
#[derive(Debug)]
pub enum Fallback {
    UnknownRange,
    Upstream(FeedError),
}

/// Result of a gateway fetch: either fresh upstream data or an empty fallback.
#[derive(Debug)]
pub enum FeedOutcome {
    Fresh(FeedSnapshot),
    Fallback(Fallback),
}

impl FeedOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FeedOutcome::Fallback(_))
    }

    /// Collapse into the events to serve; every fallback serves nothing.
    pub fn into_events(self) -> Vec<FeedEvent> {
        match self {
            FeedOutcome::Fresh(snapshot) => snapshot.events,
            FeedOutcome::Fallback(_) => Vec::new(),
        }
    }
}

/// Resolve `selector` and fetch it, turning every failure into a typed fallback.
pub async fn fetch_or_empty(source: &dyn FeedSource, selector: Option<&str>) -> FeedOutcome {
    let Some(range) = selector.and_then(FeedRange::parse) else {
        return FeedOutcome::Fallback(Fallback::UnknownRange);
    };

    match source.fetch(range).await {
        Ok(snapshot) => FeedOutcome::Fresh(snapshot),
        Err(e) => {
            tracing::warn!(error = %e, range = range.as_str(), source = source.name(), "feed fetch failed");
            FeedOutcome::Fallback(Fallback::Upstream(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geojson_keeps_order_and_null_magnitude() {
        let body = br#"{
            "type": "FeatureCollection",
            "metadata": {"count": 2},
            "features": [
                {"type": "Feature", "id": "b", "properties": {"place": "P2", "mag": null, "time": 2, "tsunami": 0}},
                {"type": "Feature", "id": "a", "properties": {"place": "P1", "mag": 2.1, "time": 1}}
            ]
        }"#;
        let snap = parse_geojson(body).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.head().unwrap().id, "b");
        assert_eq!(snap.events[0].magnitude, None);
        assert_eq!(snap.events[1].magnitude, Number::from_f64(2.1));
    }

    #[test]
    fn geojson_missing_mag_and_place_are_none() {
        let body = br#"{"features":[{"id":"x","properties":{"time":5}}]}"#;
        let snap = parse_geojson(body).unwrap();
        assert_eq!(snap.events[0].place, None);
        assert_eq!(snap.events[0].magnitude, None);
    }

    #[test]
    fn integer_magnitude_stays_integer() {
        let snap = parse_geojson(br#"{"features":[{"id":"i","properties":{"mag":2,"time":1}}]}"#).unwrap();
        let mag = snap.events[0].magnitude.clone().unwrap();
        assert_eq!(mag, Number::from(2));
        assert_eq!(serde_json::to_string(&mag).unwrap(), "2");
    }

    #[test]
    fn features_without_id_or_time_are_skipped() {
        let body = br#"{"features":[
            {"properties":{"place":"no id","mag":1.0,"time":3}},
            {"id":"keep","properties":{"place":"ok","mag":1.5,"time":2}},
            {"id":null,"properties":{"place":"null id","time":2}},
            {"id":"no-time","properties":{"place":"x","time":null}},
            {"id":"keep2","properties":{"place":"ok2","time":1}}
        ]}"#;
        let snap = parse_geojson(body).unwrap();
        let ids: Vec<&str> = snap.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["keep", "keep2"]);
    }

    #[test]
    fn geojson_without_features_is_decode_error() {
        let err = parse_geojson(br#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
    }

    #[test]
    fn empty_features_is_empty_snapshot() {
        let snap = parse_geojson(br#"{"features":[]}"#).unwrap();
        assert!(snap.is_empty());
        assert!(snap.head().is_none());
    }
}
