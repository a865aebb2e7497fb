// src/testing.rs
//! In-process fakes for the feed and the notifier, used by unit and
//! integration tests to drive the poller and the gateway without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::error::{FeedError, NotifyError};
use crate::feed::{FeedEvent, FeedRange, FeedSnapshot, FeedSource};
use crate::notify::{Notifier, PushMessage};

/// Shorthand for a feed event with a place and no magnitude.
pub fn event(id: &str, place: &str) -> FeedEvent {
    FeedEvent {
        id: id.to_string(),
        place: Some(place.to_string()),
        magnitude: None,
        time: 0,
    }
}

/// Answers fetches from a queue, in order, whatever the range. An empty
/// queue answers with an empty snapshot.
#[derive(Default)]
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Result<FeedSnapshot, FeedError>>>,
    requested: Mutex<Vec<FeedRange>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, events: Vec<FeedEvent>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(FeedSnapshot::new(events)));
    }

    pub fn push_status(&self, code: u16) {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.script
            .lock()
            .unwrap()
            .push_back(Err(FeedError::Status(status)));
    }

    pub fn push_malformed(&self) {
        let err = serde_json::from_str::<serde_json::Value>("{\"features\":").unwrap_err();
        self.script
            .lock()
            .unwrap()
            .push_back(Err(FeedError::Decode(err)));
    }

    /// Ranges fetched so far, in call order.
    pub fn requested(&self) -> Vec<FeedRange> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self, range: FeedRange) -> Result<FeedSnapshot, FeedError> {
        self.requested.lock().unwrap().push(range);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FeedSnapshot::default()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Holds every fetch until `open` is called, so a cycle can be kept in flight.
pub struct GatedFeed {
    snapshot: FeedSnapshot,
    entered: Notify,
    release: Notify,
}

impl GatedFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            snapshot: FeedSnapshot::new(events),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a fetch is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}

#[async_trait::async_trait]
impl FeedSource for GatedFeed {
    async fn fetch(&self, _range: FeedRange) -> Result<FeedSnapshot, FeedError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Records every push; the first `fail_next` pushes are rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<PushMessage>>,
    sent: Mutex<Vec<PushMessage>>,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        let n = Self::default();
        n.failures_left.store(times, Ordering::SeqCst);
        n
    }

    pub fn attempts(&self) -> Vec<PushMessage> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, msg: &PushMessage) -> Result<(), NotifyError> {
        self.attempts.lock().unwrap().push(msg.clone());
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::Token("scripted failure".into()));
        }
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
