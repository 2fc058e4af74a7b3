//! The gradebook service: identity-aware submit, history, edit, delete, and
//! teacher rollup over an `EvaluationStore`.
//!
//! Every write is computed in full before the store is called, so a rejected
//! evaluation or a failing store never leaves a half-applied record behind.

use std::sync::Arc;

use crate::engine::{evaluate, Evaluation};
use crate::error::{EvaluationError, GradebookError, StoreError};
use crate::history::{
    apply_edit, build_record, find_duplicate, group_by_subject_and_policy, merge_into,
    SubjectRollup,
};
use crate::model::{CurrentUser, EvaluationDraft, EvaluationRecord};
use crate::traits::EvaluationStore;
use crate::workflow::{DuplicateResolution, SubmissionOutcome};

/// Entry point for the record workflow.
#[derive(Clone)]
pub struct Gradebook {
    store: Arc<dyn EvaluationStore>,
}

impl Gradebook {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EvaluationStore> {
        &self.store
    }

    /// Evaluate a draft without persisting anything.
    pub fn evaluate_draft(draft: &EvaluationDraft) -> Result<Evaluation, EvaluationError> {
        evaluate(
            &draft.student_name,
            draft.policy,
            &draft.tasks,
            &draft.exam_scores,
            draft.task_weight_fraction,
        )
    }

    /// Resolve the owner and author of a submission.
    ///
    /// Students may only submit for themselves. Teachers submit for the
    /// draft's `owner_id` (or themselves) and are recorded as the author.
    fn resolve_owner(
        user: &CurrentUser,
        draft: &EvaluationDraft,
    ) -> Result<(String, Option<String>), GradebookError> {
        if user.is_teacher() {
            let owner = draft.owner_id.clone().unwrap_or_else(|| user.id.clone());
            return Ok((owner, Some(user.id.clone())));
        }

        match draft.owner_id.as_deref() {
            Some(owner) if owner != user.id => {
                tracing::warn!(user = %user.id, owner, "student submitted for another owner");
                Err(GradebookError::Forbidden(
                    "students can only submit their own evaluations".to_string(),
                ))
            }
            _ => Ok((user.id.clone(), None)),
        }
    }

    /// The record this draft would duplicate, if any.
    pub async fn find_existing(
        &self,
        user: &CurrentUser,
        draft: &EvaluationDraft,
    ) -> Result<Option<EvaluationRecord>, GradebookError> {
        let (owner, _) = Self::resolve_owner(user, draft)?;
        let history = self.store.list_by_owner(&owner).await?;
        Ok(find_duplicate(&history, &draft.subject_name, draft.policy, &owner).cloned())
    }

    /// Evaluate and persist a draft.
    ///
    /// With `MergeIntoExisting`, a matching record for the same owner, subject
    /// and policy receives the new scores; otherwise a new record is created.
    pub async fn submit(
        &self,
        user: &CurrentUser,
        draft: &EvaluationDraft,
        resolution: DuplicateResolution,
    ) -> Result<SubmissionOutcome, GradebookError> {
        let evaluation = Self::evaluate_draft(draft)?;
        let (owner, author) = Self::resolve_owner(user, draft)?;

        if resolution == DuplicateResolution::MergeIntoExisting {
            let history = self.store.list_by_owner(&owner).await?;
            if let Some(existing) =
                find_duplicate(&history, &draft.subject_name, draft.policy, &owner)
            {
                let mut merged = existing.clone();
                merge_into(
                    &mut merged,
                    &draft.tasks,
                    &draft.exam_scores,
                    draft.policy,
                    draft.task_weight_fraction,
                    &draft.student_name,
                )?;
                let stored = self.store.update(merged).await?;
                tracing::info!(
                    record = %stored.id,
                    owner = %stored.owner_id,
                    average = stored.average,
                    "merged evaluation into existing record"
                );
                return Ok(SubmissionOutcome::Merged(stored));
            }
        }

        let record = build_record(&owner, author.as_deref(), draft, &evaluation);
        let stored = self.store.insert(record).await?;
        tracing::info!(
            record = %stored.id,
            owner = %stored.owner_id,
            subject = %stored.subject_name,
            average = stored.average,
            "created evaluation"
        );
        Ok(SubmissionOutcome::Created(stored))
    }

    /// Records visible to `user`, newest first.
    ///
    /// Students see their own records; teachers see every record.
    pub async fn history(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<EvaluationRecord>, GradebookError> {
        let mut records = if user.is_teacher() {
            self.store.list_all().await?
        } else {
            self.store.list_by_owner(&user.id).await?
        };
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Per-subject/policy rollup across all students. Teachers only.
    pub async fn rollup(&self, user: &CurrentUser) -> Result<Vec<SubjectRollup>, GradebookError> {
        if !user.is_teacher() {
            tracing::warn!(user = %user.id, "rollup requested by non-teacher");
            return Err(GradebookError::Forbidden(
                "only teachers can view subject rollups".to_string(),
            ));
        }
        let records = self.store.list_all().await?;
        Ok(group_by_subject_and_policy(&records))
    }

    async fn fetch_editable(
        &self,
        user: &CurrentUser,
        id: &str,
    ) -> Result<EvaluationRecord, GradebookError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| GradebookError::NotFound(id.to_string()))?;

        if !record.editable_by(user) {
            tracing::warn!(user = %user.id, record = %id, "edit denied");
            return Err(GradebookError::Forbidden(format!(
                "{} cannot modify evaluation {id}",
                user.id
            )));
        }
        Ok(record)
    }

    /// Replace a record's scores and policy from `draft`.
    ///
    /// `expected_version` is the version the draft was read from. If the
    /// stored record has moved on, the edit fails with `Conflict` and nothing
    /// is written.
    pub async fn edit(
        &self,
        user: &CurrentUser,
        id: &str,
        draft: &EvaluationDraft,
        expected_version: u64,
    ) -> Result<EvaluationRecord, GradebookError> {
        let mut record = self.fetch_editable(user, id).await?;
        if record.version != expected_version {
            tracing::warn!(
                record = %id,
                expected = expected_version,
                stored = record.version,
                "stale edit rejected"
            );
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_version,
            }
            .into());
        }
        apply_edit(&mut record, draft)?;
        let stored = self.store.update(record).await?;
        tracing::info!(
            record = %stored.id,
            version = stored.version,
            average = stored.average,
            "edited evaluation"
        );
        Ok(stored)
    }

    /// Delete a record.
    pub async fn delete(&self, user: &CurrentUser, id: &str) -> Result<(), GradebookError> {
        self.fetch_editable(user, id).await?;
        self.store.delete(id).await?;
        tracing::info!(record = %id, "deleted evaluation");
        Ok(())
    }
}
