//! In-process store for tests and one-shot CLI runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gradebook_core::error::StoreError;
use gradebook_core::model::EvaluationRecord;
use gradebook_core::traits::{check_version, EvaluationStore};

/// A map-backed `EvaluationStore`.
///
/// Can be switched unavailable to simulate a backend outage: every call then
/// fails with `StoreError::Unavailable` and the contents stay untouched.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<String, EvaluationRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = EvaluationRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: Mutex::new(map),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make subsequent calls fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        self.ensure_available()?;
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        self.ensure_available()?;
        let mut records = self.records.lock().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        check_version(stored, &record)?;
        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.records
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self.records.lock().await.values().cloned().collect())
    }
}
