//! Error types for evaluation, persistence, and the record workflow.
//!
//! Store errors live here rather than in `gradebook-store` so the service can
//! classify conflicts and missing records without knowing the adapter.

use thiserror::Error;

use crate::model::EvaluationPolicy;

/// The score pool(s) a rejected evaluation was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPool {
    Tasks,
    Exams,
    TasksAndExams,
}

impl MissingPool {
    fn describe(self) -> &'static str {
        match self {
            MissingPool::Tasks => "at least one task score greater than 0 is required",
            MissingPool::Exams => "at least one exam score greater than 0 is required",
            MissingPool::TasksAndExams => {
                "at least one task or exam score greater than 0 is required"
            }
        }
    }
}

/// Reasons the engine declines to compute an evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// No valid scores for the pool(s) the policy requires.
    #[error("insufficient input for {policy} evaluation: {}", .missing.describe())]
    InputInsufficient {
        policy: EvaluationPolicy,
        missing: MissingPool,
    },

    /// The task/exam mix weight is outside [0, 1].
    #[error("task weight fraction must be between 0 and 1, got {0}")]
    InvalidTaskWeightFraction(f64),
}

/// Errors reported by an `EvaluationStore` adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// The record changed since it was read.
    #[error("version conflict on record {id}: expected version {expected}")]
    Conflict { id: String, expected: u64 },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("store data is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns `true` if the write lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Errors surfaced by the `Gradebook` service.
#[derive(Debug, Error)]
pub enum GradebookError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("evaluation not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("no evaluation is being edited")]
    NotEditing,
}
