//! Firestore REST client.
//!
//! Authenticates with a service-account key using the OAuth2 JWT-bearer grant
//! (RS256 assertion signed locally) and caches the access token until shortly
//! before it expires. Documents are written with string-valued fields.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{new_record_id, RecordStore, StoreError};
use crate::config::ServiceAccountKey;
use crate::models::submission::{GeneratedRecord, Submission};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

enum Auth {
    ServiceAccount {
        key: ServiceAccountKey,
        signing_key: EncodingKey,
        token: Mutex<Option<CachedToken>>,
    },
    /// The local emulator accepts a fixed bearer token.
    Emulator,
}

pub struct FirestoreStore {
    client: Client,
    documents_url: Url,
    auth: Auth,
}

impl FirestoreStore {
    /// Builds a client for the production API. Fails if the service-account
    /// private key is not a valid RSA PEM.
    pub fn new(key: ServiceAccountKey) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid service-account private key: {e}")))?;
        let documents_url = documents_url(FIRESTORE_API_URL, &key.project_id)?;

        Ok(Self {
            client: build_client()?,
            documents_url,
            auth: Auth::ServiceAccount {
                key,
                signing_key,
                token: Mutex::new(None),
            },
        })
    }

    /// Builds a client for the Firestore emulator at `host` (e.g. `localhost:8081`).
    pub fn emulator(host: &str, project_id: &str) -> Result<Self, StoreError> {
        // The emulator is local; system proxy settings must not reroute it.
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            documents_url: documents_url(&format!("http://{host}/v1"), project_id)?,
            auth: Auth::Emulator,
        })
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let (key, signing_key, token) = match &self.auth {
            Auth::Emulator => return Ok("owner".to_string()),
            Auth::ServiceAccount {
                key,
                signing_key,
                token,
            } => (key, signing_key, token),
        };

        let mut cached = token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, signing_key)
            .map_err(|e| StoreError::Auth(format!("failed to sign token assertion: {e}")))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let granted: TokenResponse = response.json().await?;
        let lifetime = granted.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        debug!("Obtained Firestore access token valid for {lifetime}s");

        let value = granted.access_token.clone();
        *cached = Some(CachedToken {
            value: granted.access_token,
            expires_at: now + chrono::Duration::seconds(lifetime),
        });
        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RecordStore for FirestoreStore {
    async fn insert(
        &self,
        collection: &str,
        submission: &Submission,
    ) -> Result<GeneratedRecord, StoreError> {
        let record = GeneratedRecord::new(new_record_id(), Utc::now(), submission.clone());

        let mut url = collection_url(&self.documents_url, collection)?;
        url.query_pairs_mut()
            .append_pair("documentId", &record.unique_id);
        let body = encode_document(&record.document_fields());

        self.send(self.client.post(url).json(&body)).await?;
        info!(
            "Stored record {} in collection '{}'",
            record.unique_id, collection
        );
        Ok(record)
    }

    async fn delete(&self, collection: &str, unique_id: &str) -> Result<(), StoreError> {
        let mut url = collection_url(&self.documents_url, collection)?;
        push_segment(&mut url, unique_id)?;

        self.send(self.client.delete(url)).await?;
        info!("Deleted record {unique_id} from collection '{collection}'");
        Ok(())
    }

    async fn shutdown(&self) {
        if let Auth::ServiceAccount { token, .. } = &self.auth {
            token.lock().await.take();
        }
        info!("Firestore client shut down");
    }
}

fn build_client() -> Result<Client, StoreError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

fn documents_url(base: &str, project_id: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(base).map_err(|e| StoreError::Encode(format!("bad base URL: {e}")))?;
    for segment in ["projects", project_id, "databases", "(default)", "documents"] {
        push_segment(&mut url, segment)?;
    }
    Ok(url)
}

fn collection_url(documents_url: &Url, collection: &str) -> Result<Url, StoreError> {
    let mut url = documents_url.clone();
    push_segment(&mut url, collection)?;
    Ok(url)
}

/// Appends one percent-encoded path segment.
fn push_segment(url: &mut Url, segment: &str) -> Result<(), StoreError> {
    url.path_segments_mut()
        .map_err(|_| StoreError::Encode("URL cannot take path segments".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(())
}

/// Firestore `Document` body with every field as a `stringValue`.
fn encode_document(fields: &BTreeMap<String, String>) -> Value {
    let fields: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "stringValue": value })))
        .collect();
    json!({ "fields": fields })
}
