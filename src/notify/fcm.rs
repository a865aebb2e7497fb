// src/notify/fcm.rs
//! Firebase Cloud Messaging (HTTP v1) topic sender.
//!
//! Auth follows the service-account flow: sign an RS256 JWT assertion with
//! the account's private key, trade it at `token_uri` for a short-lived
//! bearer token, and reuse that token until shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{Notifier, PushMessage};
use crate::config::credentials::ServiceAccountKey;
use crate::error::NotifyError;

pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    topic: &'a str,
    notification: WireNotification<'a>,
}

#[derive(Serialize)]
struct WireNotification<'a> {
    title: &'a str,
    body: &'a str,
}

impl<'a> From<&'a PushMessage> for SendRequest<'a> {
    fn from(m: &'a PushMessage) -> Self {
        Self {
            message: WireMessage {
                topic: &m.topic,
                notification: WireNotification {
                    title: &m.title,
                    body: &m.body,
                },
            },
        }
    }
}

pub struct FcmNotifier {
    client: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl FcmNotifier {
    /// Fails when the service account's private key is not a valid RSA PEM.
    pub fn new(client: Client, key: ServiceAccountKey) -> Result<Self, NotifyError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            client,
            key,
            signing_key,
            base_url: DEFAULT_FCM_BASE_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url, self.key.project_id
        )
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, NotifyError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: FCM_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        Ok(encode(&header, &claims, &self.signing_key)?)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, NotifyError> {
        let assertion = self.assertion(now)?;
        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Token(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Token(format!("unreadable token response: {e}")))?;
        tracing::debug!(expires_in = token.expires_in, "fcm access token refreshed");

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| NotifyError::Token(format!("expires_in out of range: {}", token.expires_in)))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at,
        })
    }

    async fn access_token(&self) -> Result<String, NotifyError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(tok) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(tok.value.clone());
        }
        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send(&self, msg: &PushMessage) -> Result<(), NotifyError> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(self.send_url())
            .bearer_auth(token)
            .json(&SendRequest::from(msg))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        // A revoked token must not stick around until its nominal expiry.
        if status == StatusCode::UNAUTHORIZED {
            self.forget_token().await;
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Status { status, body })
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_nests_notification_under_message() {
        let m = PushMessage {
            topic: "earthquake_alerts".into(),
            title: "Earthquake Alert!".into(),
            body: "P1".into(),
        };
        let v = serde_json::to_value(SendRequest::from(&m)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "message": {
                    "topic": "earthquake_alerts",
                    "notification": { "title": "Earthquake Alert!", "body": "P1" }
                }
            })
        );
    }

    #[test]
    fn token_within_margin_is_stale() {
        let now = Utc::now();
        let tok = CachedToken {
            value: "t".into(),
            expires_at: now + Duration::seconds(REFRESH_MARGIN_SECS - 1),
        };
        assert!(!tok.is_fresh(now));
        let tok = CachedToken {
            value: "t".into(),
            expires_at: now + Duration::seconds(3_000),
        };
        assert!(tok.is_fresh(now));
    }
}
