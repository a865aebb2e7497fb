// src/feed/usgs.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;

use crate::error::FeedError;
use crate::feed::{parse_geojson, FeedRange, FeedRegistry, FeedSnapshot, FeedSource};

/// GeoJSON summary feed client over HTTP.
#[derive(Clone)]
pub struct UsgsFeed {
    client: Client,
    registry: FeedRegistry,
}

impl UsgsFeed {
    pub fn new(client: Client, registry: FeedRegistry) -> Self {
        Self { client, registry }
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    async fn get_snapshot(&self, url: &str) -> Result<FeedSnapshot, FeedError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }
        let body = resp.bytes().await?;
        parse_geojson(&body)
    }
}

#[async_trait]
impl FeedSource for UsgsFeed {
    async fn fetch(&self, range: FeedRange) -> Result<FeedSnapshot, FeedError> {
        let t0 = std::time::Instant::now();
        let result = self.get_snapshot(self.registry.url(range)).await;
        histogram!("feed_fetch_ms", "range" => range.as_str())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(snapshot) => {
                tracing::debug!(range = range.as_str(), events = snapshot.len(), "feed fetched");
            }
            Err(_) => {
                counter!("feed_fetch_errors_total", "range" => range.as_str()).increment(1);
            }
        }
        result
    }

    fn name(&self) -> &'static str {
        "usgs"
    }
}
