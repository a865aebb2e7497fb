// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod notify;
pub mod poller;
pub mod testing;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::Settings;
pub use crate::error::{FeedError, NotifyError};
pub use crate::feed::{FeedEvent, FeedRange, FeedRegistry, FeedSnapshot, FeedSource};
pub use crate::notify::{AlertTemplate, Notifier, PushMessage};
pub use crate::poller::{DedupStore, InMemoryDedup, Poller, TickOutcome};

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use crate::feed::usgs::UsgsFeed;

/// Everything the server binary runs: the HTTP app and a poller ready to spawn.
pub struct Service {
    pub router: Router,
    pub poller: Arc<Poller>,
}

/// Wire settings into a running shape. Fails only on bootstrap problems
/// (bad credentials, HTTP client construction, metrics recorder).
pub fn build(settings: &Settings) -> Result<Service> {
    // Recorder first so metric descriptions below land in it.
    let exporter = if settings.metrics_enabled {
        Some(crate::metrics::Metrics::init()?)
    } else {
        None
    };

    let client = settings.http_client()?;
    let feeds: Arc<dyn FeedSource> = Arc::new(UsgsFeed::new(client.clone(), settings.feeds.clone()));
    let notifier = notify::from_settings(settings, client)?;

    let poller = Arc::new(Poller::new(
        Arc::clone(&feeds),
        notifier,
        Arc::new(InMemoryDedup::new()),
        settings.alert.clone(),
    ));

    let mut router = api::create_router(AppState::new(feeds));
    if let Some(m) = exporter {
        router = router.merge(m.router());
    }

    Ok(Service { router, poller })
}
