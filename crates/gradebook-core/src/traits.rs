//! Store trait for evaluation records.
//!
//! The document store is an external collaborator; adapters in
//! `gradebook-store` implement this trait for memory, a local JSON file, and
//! a remote HTTP document API.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::EvaluationRecord;

/// Persistence seam for evaluation records keyed by an opaque id.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Human-readable store name (e.g. "memory").
    fn name(&self) -> &str;

    /// Persist a new record. Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError>;

    /// Replace a record if its `version` still matches the stored one.
    ///
    /// Returns the stored record with the bumped version, or `Conflict` when
    /// another writer got there first.
    async fn update(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError>;

    /// Delete a record by id. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All records owned by `owner_id`.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationRecord>, StoreError>;

    /// Every record in the store.
    async fn list_all(&self) -> Result<Vec<EvaluationRecord>, StoreError>;
}

/// Check the optimistic concurrency precondition for an update.
///
/// Shared by adapters that hold the whole collection locally.
pub fn check_version(
    stored: &EvaluationRecord,
    incoming: &EvaluationRecord,
) -> Result<(), StoreError> {
    if stored.version == incoming.version {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            id: incoming.id.clone(),
            expected: incoming.version,
        })
    }
}
