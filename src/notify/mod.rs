// src/notify/mod.rs
pub mod fcm;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::credentials::ServiceAccountKey;
use crate::config::Settings;
use crate::error::NotifyError;

pub const DEFAULT_ALERT_TOPIC: &str = "earthquake_alerts";
pub const DEFAULT_ALERT_TITLE: &str = "Earthquake Alert!";
/// Body used when the head event carries no place string.
pub const UNKNOWN_PLACE: &str = "Unknown location";

/// One topic push: `{ topic, notification: { title, body } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub topic: String,
    pub title: String,
    pub body: String,
}

/// Fixed topic + title every alert is sent with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTemplate {
    pub topic: String,
    pub title: String,
}

impl Default for AlertTemplate {
    fn default() -> Self {
        Self {
            topic: DEFAULT_ALERT_TOPIC.to_string(),
            title: DEFAULT_ALERT_TITLE.to_string(),
        }
    }
}

impl AlertTemplate {
    pub fn message(&self, place: Option<&str>) -> PushMessage {
        PushMessage {
            topic: self.topic.clone(),
            title: self.title.clone(),
            body: place.unwrap_or(UNKNOWN_PLACE).to_string(),
        }
    }
}

/// Push dispatch capability. Delivery guarantees belong to the backend.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &PushMessage) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Dry-run notifier: logs the alert instead of pushing it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, msg: &PushMessage) -> Result<(), NotifyError> {
        tracing::info!(
            target: "notify",
            topic = %msg.topic,
            title = %msg.title,
            body = %msg.body,
            "dry-run alert"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick the notifier for this process: log-only under dry run, FCM otherwise.
/// Missing credentials outside dry run are fatal.
pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Result<Arc<dyn Notifier>> {
    if settings.notify_dry_run {
        tracing::warn!("NOTIFY_DRY_RUN set; alerts are logged, not pushed");
        return Ok(Arc::new(LogNotifier));
    }

    let key = ServiceAccountKey::from_env()?;
    tracing::info!(
        project_id = %key.project_id,
        client_email = %key.client_email,
        "service account loaded"
    );
    let fcm = fcm::FcmNotifier::new(client, key)?.with_base_url(&settings.fcm_base_url);
    Ok(Arc::new(fcm))
}
