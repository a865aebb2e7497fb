// src/feed/registry.rs
use serde::{Deserialize, Serialize};

pub const USGS_HOUR_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_hour.geojson";
pub const USGS_WEEK_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const USGS_MONTH_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.geojson";

/// Upstream time window selecting which feed URL to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedRange {
    Hour,
    Week,
    Month,
}

impl FeedRange {
    pub const ALL: [FeedRange; 3] = [FeedRange::Hour, FeedRange::Week, FeedRange::Month];

    /// Exact, case-sensitive match on the three range keys.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hour" => Some(FeedRange::Hour),
            "week" => Some(FeedRange::Week),
            "month" => Some(FeedRange::Month),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedRange::Hour => "hour",
            FeedRange::Week => "week",
            FeedRange::Month => "month",
        }
    }
}

fn default_hour() -> String {
    USGS_HOUR_URL.to_string()
}
fn default_week() -> String {
    USGS_WEEK_URL.to_string()
}
fn default_month() -> String {
    USGS_MONTH_URL.to_string()
}

/// Static range -> URL table, read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRegistry {
    #[serde(default = "default_hour")]
    pub hour: String,
    #[serde(default = "default_week")]
    pub week: String,
    #[serde(default = "default_month")]
    pub month: String,
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            week: default_week(),
            month: default_month(),
        }
    }
}

impl FeedRegistry {
    /// All three ranges served from one base URL as `{base}/{range}`.
    /// Handy for pointing the service at a local mirror.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            hour: format!("{base}/hour"),
            week: format!("{base}/week"),
            month: format!("{base}/month"),
        }
    }

    pub fn url(&self, range: FeedRange) -> &str {
        match range {
            FeedRange::Hour => &self.hour,
            FeedRange::Week => &self.week,
            FeedRange::Month => &self.month,
        }
    }
}
