// src/poller/dedup.rs
use std::sync::Mutex;

/// Memory of the last event id an alert went out for.
///
/// Only the single most recent id is kept: a burst of new events between two
/// polls produces one alert, for whichever event heads the feed.
pub trait DedupStore: Send + Sync {
    fn last_notified(&self) -> Option<String>;

    /// Store `id` if it differs from the remembered one.
    /// Returns `true` when `id` is new (and is now remembered).
    fn remember(&self, id: &str) -> bool;

    fn reset(&self);
}

/// Process-lifetime store; starts empty and is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryDedup {
    last: Mutex<Option<String>>,
}

impl InMemoryDedup {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupStore for InMemoryDedup {
    fn last_notified(&self) -> Option<String> {
        self.last.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn remember(&self, id: &str) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if last.as_deref() == Some(id) {
            return false;
        }
        *last = Some(id.to_string());
        true
    }

    fn reset(&self) {
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_remembers_once() {
        let d = InMemoryDedup::new();
        assert_eq!(d.last_notified(), None);
        assert!(d.remember("ev1"));
        assert!(!d.remember("ev1"));
        assert_eq!(d.last_notified().as_deref(), Some("ev1"));
    }

    #[test]
    fn only_the_latest_id_is_kept() {
        let d = InMemoryDedup::new();
        assert!(d.remember("a"));
        assert!(d.remember("b"));
        // "a" is no longer remembered
        assert!(d.remember("a"));
    }

    #[test]
    fn reset_forgets() {
        let d = InMemoryDedup::new();
        d.remember("x");
        d.reset();
        assert_eq!(d.last_notified(), None);
        assert!(d.remember("x"));
    }
}
