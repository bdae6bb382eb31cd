//! Record persistence. Every submission becomes one immutable document in a
//! named collection of the remote store.
//!
//! `AppState` holds an `Arc<dyn RecordStore>`: `FirestoreStore` in production,
//! `MemoryStore` in tests.

pub mod firestore;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::submission::{GeneratedRecord, Submission};

pub use firestore::FirestoreStore;
#[cfg(test)]
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("encoding error: {0}")]
    Encode(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes the submission plus a fresh identifier and UTC timestamp as one
    /// document. No retry and no idempotency key: a repeated submission
    /// creates a second record.
    async fn insert(
        &self,
        collection: &str,
        submission: &Submission,
    ) -> Result<GeneratedRecord, StoreError>;

    /// Removes a record written by `insert`. Used to compensate when the
    /// offer letter could not be written after the record was stored.
    async fn delete(&self, collection: &str, unique_id: &str) -> Result<(), StoreError>;

    /// Releases client resources. Called once during graceful shutdown.
    async fn shutdown(&self) {}
}

/// Opaque, unique document identifier (32 lowercase hex chars).
pub fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}
