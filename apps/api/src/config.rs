use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Application configuration loaded from environment variables.
/// Startup fails if the service-account credential is missing or unreadable.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_account: ServiceAccountKey,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub collection: String,
    pub company_tag: String,
    /// When set, records go to the Firestore emulator instead of the cloud API.
    pub firestore_emulator_host: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

/// The subset of a Google service-account JSON key the Firestore client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Keeps the private key out of logs.
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Decodes a base64-encoded service-account JSON blob.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .context("FIREBASE_KEY is not valid base64")?;
        let json = String::from_utf8(raw).context("FIREBASE_KEY does not decode to UTF-8")?;
        serde_json::from_str(&json).context("FIREBASE_KEY is not a service-account JSON key")
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            service_account: ServiceAccountKey::from_base64(&require_env("FIREBASE_KEY")?)?,
            templates_dir: env_or("TEMPLATES_DIR", ".").into(),
            output_dir: env_or("OUTPUT_DIR", "offer_letters").into(),
            collection: env_or("FIRESTORE_COLLECTION", "OFFER LETTER"),
            company_tag: env_or("COMPANY_TAG", "HETERIZE_INFOTECH"),
            firestore_emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST").ok(),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Config rooted at a scratch directory: templates in `<root>/templates`,
    /// output in `<root>/offer_letters`.
    pub fn for_tests(root: &std::path::Path) -> Self {
        Config {
            service_account: ServiceAccountKey {
                project_id: "test-project".to_string(),
                client_email: "svc@test-project.iam.gserviceaccount.com".to_string(),
                private_key: String::new(),
                token_uri: DEFAULT_TOKEN_URI.to_string(),
            },
            templates_dir: root.join("templates"),
            output_dir: root.join("offer_letters"),
            collection: "OFFER LETTER".to_string(),
            company_tag: "HETERIZE_INFOTECH".to_string(),
            firestore_emulator_host: None,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
