//! History aggregation: duplicate lookup, merge-in-place, edits, and the
//! teacher rollup by subject and policy.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::{
    evaluate, valid_exam_scores, valid_tasks, Evaluation, RawScore, PASS_THRESHOLD,
};
use crate::error::EvaluationError;
use crate::model::{EvaluationDraft, EvaluationPolicy, EvaluationRecord, ScoreEntry};

/// Comparison key for subject names: trimmed, case-insensitive.
pub fn subject_key(subject_name: &str) -> String {
    subject_name.trim().to_lowercase()
}

/// Find the record a new submission would duplicate.
pub fn find_duplicate<'a>(
    history: &'a [EvaluationRecord],
    subject_name: &str,
    policy: EvaluationPolicy,
    owner_id: &str,
) -> Option<&'a EvaluationRecord> {
    let key = subject_key(subject_name);
    history.iter().find(|r| {
        r.owner_id == owner_id && r.policy == policy && subject_key(&r.subject_name) == key
    })
}

/// Keep positive tasks only, labeling untitled ones `Task {n}` after `existing` entries.
pub fn label_new_tasks(existing: usize, new_tasks: &[ScoreEntry]) -> Vec<ScoreEntry> {
    valid_tasks(new_tasks)
        .enumerate()
        .map(|(i, task)| {
            let mut task = task.clone();
            if task.title.trim().is_empty() {
                task.title = format!("Task {}", existing + i + 1);
            }
            task
        })
        .collect()
}

fn fraction_for(policy: EvaluationPolicy, task_weight_fraction: f64) -> Option<f64> {
    policy
        .uses_task_weight_fraction()
        .then_some(task_weight_fraction)
}

/// Build a new record from a draft that has already been evaluated.
pub fn build_record(
    owner_id: &str,
    author_id: Option<&str>,
    draft: &EvaluationDraft,
    evaluation: &Evaluation,
) -> EvaluationRecord {
    EvaluationRecord {
        id: EvaluationRecord::new_id(),
        owner_id: owner_id.to_string(),
        author_id: author_id.map(str::to_string),
        timestamp: Utc::now(),
        subject_name: draft.subject_name.trim().to_string(),
        student_name: draft.student_name.clone(),
        policy: draft.policy,
        result_text: evaluation.result_text.clone(),
        average: evaluation.average,
        tasks: label_new_tasks(0, &draft.tasks),
        exam_scores: valid_exam_scores(&draft.exam_scores),
        task_weight_fraction: fraction_for(draft.policy, draft.task_weight_fraction),
        version: 1,
    }
}

/// Append new scores to an existing record and recompute it.
///
/// The merged pools are evaluated with the same rules as a fresh evaluation.
/// On rejection `existing` is left untouched.
pub fn merge_into<E: RawScore>(
    existing: &mut EvaluationRecord,
    new_tasks: &[ScoreEntry],
    new_exam_scores: &[E],
    policy: EvaluationPolicy,
    task_weight_fraction: f64,
    name: &str,
) -> Result<(), EvaluationError> {
    let mut tasks = existing.tasks.clone();
    let appended = label_new_tasks(tasks.len(), new_tasks);
    tasks.extend(appended);

    let mut exam_scores = existing.exam_scores.clone();
    exam_scores.extend(valid_exam_scores(new_exam_scores));

    let name = if name.trim().is_empty() {
        existing.student_name.clone()
    } else {
        name.to_string()
    };

    let evaluation = evaluate(&name, policy, &tasks, &exam_scores, task_weight_fraction)?;

    tracing::debug!(
        record = %existing.id,
        tasks = tasks.len(),
        exams = exam_scores.len(),
        average = evaluation.average,
        "merged scores into record"
    );

    existing.tasks = tasks;
    existing.exam_scores = exam_scores;
    existing.policy = policy;
    existing.task_weight_fraction = fraction_for(policy, task_weight_fraction);
    existing.student_name = name;
    existing.average = evaluation.average;
    existing.result_text = evaluation.result_text;
    existing.timestamp = Utc::now();
    Ok(())
}

/// Replace a record's scores, policy and names wholesale from a draft.
///
/// Blank names in the draft keep the record's current values. The average is
/// always recomputed; on rejection the record is left untouched.
pub fn apply_edit(
    record: &mut EvaluationRecord,
    draft: &EvaluationDraft,
) -> Result<(), EvaluationError> {
    let student_name = if draft.student_name.trim().is_empty() {
        record.student_name.clone()
    } else {
        draft.student_name.clone()
    };

    let evaluation = evaluate(
        &student_name,
        draft.policy,
        &draft.tasks,
        &draft.exam_scores,
        draft.task_weight_fraction,
    )?;

    if !draft.subject_name.trim().is_empty() {
        record.subject_name = draft.subject_name.trim().to_string();
    }
    record.student_name = student_name;
    record.policy = draft.policy;
    record.tasks = label_new_tasks(0, &draft.tasks);
    record.exam_scores = valid_exam_scores(&draft.exam_scores);
    record.task_weight_fraction = fraction_for(draft.policy, draft.task_weight_fraction);
    record.average = evaluation.average;
    record.result_text = evaluation.result_text;
    record.timestamp = Utc::now();
    Ok(())
}

/// A record below the pass threshold within a rollup group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailingRecord {
    pub record_id: String,
    pub owner_id: String,
    pub student_name: String,
    pub average: f64,
}

/// Teacher-facing aggregate for one (subject, policy) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRollup {
    /// First spelling of the subject seen in the group.
    pub subject_name: String,
    pub policy: EvaluationPolicy,
    /// Unweighted mean of member averages.
    pub average: f64,
    pub count: usize,
    pub failing: Vec<FailingRecord>,
}

impl SubjectRollup {
    pub fn failing_count(&self) -> usize {
        self.failing.len()
    }
}

/// Group records by subject and policy.
///
/// Output is ordered by subject (case-insensitive), then by policy.
pub fn group_by_subject_and_policy(history: &[EvaluationRecord]) -> Vec<SubjectRollup> {
    // Keyed by policy name so groups within a subject sort alphabetically.
    let mut grouped: BTreeMap<(String, String), Vec<&EvaluationRecord>> = BTreeMap::new();
    for record in history {
        grouped
            .entry((subject_key(&record.subject_name), record.policy.to_string()))
            .or_default()
            .push(record);
    }

    grouped
        .into_values()
        .map(|members| {
            let policy = members[0].policy;
            let count = members.len();
            let average = members.iter().map(|r| r.average).sum::<f64>() / count as f64;
            let failing = members
                .iter()
                .filter(|r| r.average < PASS_THRESHOLD)
                .map(|r| FailingRecord {
                    record_id: r.id.clone(),
                    owner_id: r.owner_id.clone(),
                    student_name: r.student_name.clone(),
                    average: r.average,
                })
                .collect();

            SubjectRollup {
                subject_name: members[0].subject_name.trim().to_string(),
                policy,
                average,
                count,
                failing,
            }
        })
        .collect()
}
