// src/config/credentials.rs
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

pub const ENV_SERVICE_ACCOUNT_B64: &str = "GOOGLE_SERVICE_ACCOUNT_B64";
pub const ENV_SERVICE_ACCOUNT_FILE: &str = "GOOGLE_SERVICE_ACCOUNT_FILE";
pub const ENV_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a Google service-account JSON key the push sender needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Never print key material.
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(s: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(s).context("parsing service account JSON")?;
        if key.project_id.trim().is_empty() {
            return Err(anyhow!("service account has an empty project_id"));
        }
        Ok(key)
    }

    /// Decode a base64-encoded JSON key (whitespace inside the blob is ignored).
    pub fn from_base64(blob: &str) -> Result<Self> {
        let clean: String = blob.chars().filter(|c| !c.is_whitespace()).collect();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(clean)
            .context("decoding base64 service account")?;
        let json = String::from_utf8(raw).context("service account is not valid UTF-8")?;
        Self::from_json(&json)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading service account from {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Resolve credentials from the environment:
    /// 1) $GOOGLE_SERVICE_ACCOUNT_B64
    /// 2) $GOOGLE_SERVICE_ACCOUNT_FILE
    /// 3) $GOOGLE_APPLICATION_CREDENTIALS
    pub fn from_env() -> Result<Self> {
        if let Some(blob) = non_empty_var(ENV_SERVICE_ACCOUNT_B64) {
            return Self::from_base64(&blob);
        }
        for var in [ENV_SERVICE_ACCOUNT_FILE, ENV_APPLICATION_CREDENTIALS] {
            if let Some(p) = non_empty_var(var) {
                return Self::from_path(Path::new(&p));
            }
        }
        Err(anyhow!(
            "no service account configured; set {ENV_SERVICE_ACCOUNT_B64}, \
             {ENV_SERVICE_ACCOUNT_FILE} or {ENV_APPLICATION_CREDENTIALS}"
        ))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
