//! gradebook-core — Grade evaluation engine, history aggregation, and the
//! record workflow.
//!
//! This crate defines the data model, the pure scoring and aggregation
//! functions, and the `EvaluationStore` seam that the `gradebook-store`
//! adapters implement.

pub mod engine;
pub mod error;
pub mod history;
pub mod model;
pub mod parser;
pub mod service;
pub mod traits;
pub mod workflow;

pub use engine::{compute_average, evaluate, normalize_weights, Evaluation, PASS_THRESHOLD};
pub use error::{EvaluationError, GradebookError, MissingPool, StoreError};
pub use model::{
    CurrentUser, EvaluationDraft, EvaluationPolicy, EvaluationRecord, Role, ScoreEntry,
};
pub use service::Gradebook;
pub use traits::EvaluationStore;
