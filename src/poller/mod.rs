// src/poller/mod.rs
//! Head-of-feed change detector: polls the `hour` feed and pushes one alert
//! per new head event id.

pub mod dedup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::feed::{FeedRange, FeedSource};
use crate::notify::{AlertTemplate, Notifier};
pub use dedup::{DedupStore, InMemoryDedup};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poller_ticks_total", "Poll cycles that ran.");
        describe_counter!(
            "poller_ticks_skipped_total",
            "Ticks skipped because a cycle was still in flight."
        );
        describe_counter!("poller_fetch_errors_total", "Poll cycles whose feed fetch failed.");
        describe_counter!("alerts_sent_total", "Push alerts accepted by the notifier.");
        describe_counter!("alerts_failed_total", "Push alerts the notifier rejected.");
    });
}

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another cycle was in flight; this one was skipped.
    Busy,
    FetchFailed,
    EmptyFeed,
    /// Head event already alerted.
    Unchanged { id: String },
    Alerted { id: String },
    /// Dispatch failed; the id stays remembered and is not retried.
    AlertFailed { id: String },
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Poller {
    feed: Arc<dyn FeedSource>,
    notifier: Arc<dyn Notifier>,
    dedup: Arc<dyn DedupStore>,
    alert: AlertTemplate,
    in_flight: AtomicBool,
}

impl Poller {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        dedup: Arc<dyn DedupStore>,
        alert: AlertTemplate,
    ) -> Self {
        ensure_metrics_described();
        Self {
            feed,
            notifier,
            dedup,
            alert,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn dedup(&self) -> &Arc<dyn DedupStore> {
        &self.dedup
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one fetch-and-maybe-notify cycle. Never returns an error: failures
    /// are logged and reported through the outcome.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            counter!("poller_ticks_skipped_total").increment(1);
            tracing::debug!(target: "poller", "previous cycle still running, tick skipped");
            return TickOutcome::Busy;
        };
        counter!("poller_ticks_total").increment(1);

        let snapshot = match self.feed.fetch(FeedRange::Hour).await {
            Ok(s) => s,
            Err(e) => {
                counter!("poller_fetch_errors_total").increment(1);
                tracing::warn!(target: "poller", error = %e, source = self.feed.name(), "feed fetch failed");
                return TickOutcome::FetchFailed;
            }
        };

        let Some(latest) = snapshot.head() else {
            tracing::trace!(target: "poller", "hour feed empty");
            return TickOutcome::EmptyFeed;
        };

        // Remember before dispatch so a failed push is not retried next tick.
        if !self.dedup.remember(&latest.id) {
            tracing::trace!(target: "poller", id = %latest.id, "no change");
            return TickOutcome::Unchanged {
                id: latest.id.clone(),
            };
        }

        let msg = self.alert.message(latest.place.as_deref());
        match self.notifier.send(&msg).await {
            Ok(()) => {
                counter!("alerts_sent_total").increment(1);
                tracing::info!(
                    target: "poller",
                    id = %latest.id,
                    place = %msg.body,
                    magnitude = ?latest.magnitude,
                    notifier = self.notifier.name(),
                    "new earthquake alert sent"
                );
                TickOutcome::Alerted {
                    id: latest.id.clone(),
                }
            }
            Err(e) => {
                counter!("alerts_failed_total").increment(1);
                tracing::warn!(
                    target: "poller",
                    id = %latest.id,
                    error = %e,
                    notifier = self.notifier.name(),
                    "alert dispatch failed"
                );
                TickOutcome::AlertFailed {
                    id: latest.id.clone(),
                }
            }
        }
    }

    /// Tick immediately, then every `every`. Each tick runs as its own task so
    /// a slow cycle makes the next tick observe `Busy` and skip.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(target: "poller", interval_secs = every.as_secs(), "poller started");
            loop {
                ticker.tick().await;
                let poller = Arc::clone(&self);
                tokio::spawn(async move {
                    poller.tick().await;
                });
            }
        })
    }
}
