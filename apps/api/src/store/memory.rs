use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{new_record_id, RecordStore, StoreError};
use crate::models::submission::{GeneratedRecord, Submission};

/// In-process record store backing the handler tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<(String, GeneratedRecord)>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes fail as a remote outage would.
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::Relaxed);
        store
    }

    pub fn records(&self, collection: &str) -> Vec<GeneratedRecord> {
        self.lock()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, GeneratedRecord)>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Api {
                status: 503,
                message: "record store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        submission: &Submission,
    ) -> Result<GeneratedRecord, StoreError> {
        self.check_available()?;
        let record = GeneratedRecord::new(new_record_id(), Utc::now(), submission.clone());
        self.lock().push((collection.to_string(), record.clone()));
        Ok(record)
    }

    async fn delete(&self, collection: &str, unique_id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock()
            .retain(|(c, record)| !(c == collection && record.unique_id == unique_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids_for_duplicates() {
        let store = MemoryStore::new();
        let submission: Submission = [("name", "Asha")].into_iter().collect();

        let first = store.insert("OFFER LETTER", &submission).await.unwrap();
        let second = store.insert("OFFER LETTER", &submission).await.unwrap();

        assert_ne!(first.unique_id, second.unique_id);
        assert_eq!(store.records("OFFER LETTER").len(), 2);
        assert!(store.records("other").is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_named_record() {
        let store = MemoryStore::new();
        let submission = Submission::default();
        let keep = store.insert("c", &submission).await.unwrap();
        let drop = store.insert("c", &submission).await.unwrap();

        store.delete("c", &drop.unique_id).await.unwrap();

        let remaining = store.records("c");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].unique_id, keep.unique_id);
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes() {
        let store = MemoryStore::failing();
        let err = store.insert("c", &Submission::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        assert!(store.records("c").is_empty());
    }
}
