//! Local JSON file store.
//!
//! The whole collection lives in one pretty-printed JSON array. Every call
//! reads the file; writes replace it through a temporary sibling file so a
//! crash mid-write leaves the previous contents intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gradebook_core::error::StoreError;
use gradebook_core::model::EvaluationRecord;
use gradebook_core::traits::{check_version, EvaluationStore};

/// An `EvaluationStore` backed by a JSON file on disk.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn save(&self, records: &[EvaluationRecord]) -> Result<(), StoreError> {
        let unavailable =
            |e: std::io::Error| StoreError::Unavailable(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(unavailable)?;

        tracing::debug!(path = %self.path.display(), count = records.len(), "wrote store file");
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.push(record.clone());
        self.save(&records).await?;
        Ok(record)
    }

    async fn update(&self, mut record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        check_version(stored, &record)?;
        record.version += 1;
        *stored = record.clone();
        self.save(&records).await?;
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|r| r.id == id))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(&records).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.retain(|r| r.owner_id == owner_id);
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gradebook_core::model::{EvaluationPolicy, ScoreEntry};

    fn record(id: &str, owner: &str) -> EvaluationRecord {
        EvaluationRecord {
            id: id.into(),
            owner_id: owner.into(),
            author_id: Some("t1".into()),
            timestamp: Utc::now(),
            subject_name: "History".into(),
            student_name: "Ana".into(),
            policy: EvaluationPolicy::TasksAndExam,
            result_text: "Sorry Ana, you did not pass. Your average is 5.80.".into(),
            average: 5.8,
            tasks: vec![ScoreEntry::scored(7.0).with_title("Task 1")],
            exam_scores: vec![5.0],
            task_weight_fraction: Some(0.4),
            version: 1,
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nothing.json"));
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("evaluations.json");

        let store = JsonFileStore::new(&path);
        store.insert(record("a", "u1")).await.unwrap();
        store.insert(record("b", "u2")).await.unwrap();
        assert!(path.exists());

        let reopened = JsonFileStore::new(&path);
        let loaded = reopened.get("a").await.unwrap().unwrap();
        assert_eq!(loaded.tasks[0].title, "Task 1");
        assert_eq!(loaded.task_weight_fraction, Some(0.4));
        assert_eq!(reopened.list_by_owner("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("evaluations.json"));
        let original = store.insert(record("a", "u1")).await.unwrap();

        let saved = store.update(original.clone()).await.unwrap();
        assert_eq!(saved.version, 2);
        assert!(store.update(original).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("evaluations.json"));
        store.insert(record("a", "u1")).await.unwrap();

        store.delete("a").await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(matches!(
            store.delete("a").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.list_all().await.unwrap_err(),
            StoreError::Corrupt(_)
        ));
    }
}
