// src/error.rs
//! Error taxonomy for the two external collaborators. Neither ever reaches a
//! client: the gateway degrades to an empty list, the poller logs and moves on.

use reqwest::StatusCode;
use thiserror::Error;

/// Upstream feed fetch failure.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(StatusCode),

    #[error("feed body is not a valid GeoJSON summary: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Push notification dispatch failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("access token exchange failed: {0}")]
    Token(String),

    #[error("signing token assertion failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("push service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}
