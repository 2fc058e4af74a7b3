//! Submit and edit flow types.
//!
//! A submission that collides with an existing (owner, subject, policy)
//! record is resolved by an explicit `DuplicateResolution` chosen before the
//! service is called. Edits go through an `EditSession`:
//! `Idle -> Editing -> Idle` on save or cancel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GradebookError;
use crate::model::{
    default_task_weight_fraction, CurrentUser, EvaluationDraft, EvaluationRecord,
};
use crate::service::Gradebook;

/// What to do when a submission matches an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateResolution {
    /// Append the new scores to the existing record.
    #[default]
    MergeIntoExisting,
    /// Store the submission as a separate record.
    CreateNew,
}

impl fmt::Display for DuplicateResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateResolution::MergeIntoExisting => write!(f, "merge"),
            DuplicateResolution::CreateNew => write!(f, "new"),
        }
    }
}

impl FromStr for DuplicateResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" | "merge-into-existing" | "update" => {
                Ok(DuplicateResolution::MergeIntoExisting)
            }
            "new" | "create-new" | "create" => Ok(DuplicateResolution::CreateNew),
            other => Err(format!("unknown duplicate resolution: {other}")),
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// No duplicate (or `CreateNew` chosen): a fresh record was stored.
    Created(EvaluationRecord),
    /// The scores were merged into an existing record.
    Merged(EvaluationRecord),
}

impl SubmissionOutcome {
    pub fn record(&self) -> &EvaluationRecord {
        match self {
            SubmissionOutcome::Created(r) | SubmissionOutcome::Merged(r) => r,
        }
    }

    pub fn into_record(self) -> EvaluationRecord {
        match self {
            SubmissionOutcome::Created(r) | SubmissionOutcome::Merged(r) => r,
        }
    }

    pub fn was_merged(&self) -> bool {
        matches!(self, SubmissionOutcome::Merged(_))
    }
}

impl From<&EvaluationRecord> for EvaluationDraft {
    fn from(record: &EvaluationRecord) -> Self {
        Self {
            student_name: record.student_name.clone(),
            subject_name: record.subject_name.clone(),
            policy: record.policy,
            tasks: record.tasks.clone(),
            exam_scores: record.exam_scores.iter().copied().map(Some).collect(),
            task_weight_fraction: record
                .task_weight_fraction
                .unwrap_or_else(default_task_weight_fraction),
            owner_id: Some(record.owner_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
enum EditState {
    #[default]
    Idle,
    Editing {
        record: EvaluationRecord,
        draft: EvaluationDraft,
    },
}

/// Per-record edit flow.
///
/// The draft is owned by the session; the stored record only changes when
/// `save` succeeds.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// Start editing `record`, discarding any edit in progress.
    pub fn begin(&mut self, record: EvaluationRecord) {
        let draft = EvaluationDraft::from(&record);
        self.state = EditState::Editing { record, draft };
    }

    /// The record being edited, as it was when editing began.
    pub fn original(&self) -> Option<&EvaluationRecord> {
        match &self.state {
            EditState::Editing { record, .. } => Some(record),
            EditState::Idle => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut EvaluationDraft> {
        match &mut self.state {
            EditState::Editing { draft, .. } => Some(draft),
            EditState::Idle => None,
        }
    }

    /// Abandon the edit and return to `Idle`.
    pub fn cancel(&mut self) -> Option<EvaluationRecord> {
        match std::mem::take(&mut self.state) {
            EditState::Editing { record, .. } => Some(record),
            EditState::Idle => None,
        }
    }

    /// Persist the draft against the version read at `begin`.
    ///
    /// If the record changed since then, this fails with `Conflict`. On any
    /// failure the session stays in `Editing`.
    pub async fn save(
        &mut self,
        gradebook: &Gradebook,
        user: &CurrentUser,
    ) -> Result<EvaluationRecord, GradebookError> {
        let (id, version, draft) = match &self.state {
            EditState::Editing { record, draft } => {
                (record.id.clone(), record.version, draft.clone())
            }
            EditState::Idle => return Err(GradebookError::NotEditing),
        };

        let saved = gradebook.edit(user, &id, &draft, version).await?;
        self.state = EditState::Idle;
        Ok(saved)
    }
}
