//! Evaluation engine: pool averages, policy combination, and pass/fail.
//!
//! Every function here is pure. Placeholder rows (`0`, `None`, negative or
//! non-finite scores) are filtered out before any arithmetic.

use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, MissingPool};
use crate::model::{EvaluationPolicy, ScoreEntry};

/// Minimum average that passes.
pub const PASS_THRESHOLD: f64 = 6.0;

/// A raw exam score as it arrives from a form or from storage.
pub trait RawScore {
    fn raw(&self) -> Option<f64>;
}

impl RawScore for f64 {
    fn raw(&self) -> Option<f64> {
        Some(*self)
    }
}

impl RawScore for Option<f64> {
    fn raw(&self) -> Option<f64> {
        *self
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub average: f64,
    pub passed: bool,
    pub result_text: String,
}

/// Normalize raw weights so they sum to 1.
///
/// Negative and non-finite weights count as 0. If nothing is left, the
/// weights are distributed uniformly. Weights are scaled by their maximum
/// first so the sum stays finite for any finite input.
pub fn normalize_weights(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }

    let cleaned: Vec<f64> = raw
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let max = cleaned.iter().copied().fold(0.0, f64::max);

    if max == 0.0 {
        let uniform = 1.0 / cleaned.len() as f64;
        return vec![uniform; cleaned.len()];
    }

    let scaled: Vec<f64> = cleaned.into_iter().map(|w| w / max).collect();
    let total: f64 = scaled.iter().sum();
    scaled.into_iter().map(|w| w / total).collect()
}

/// Positive scores from a task list.
pub fn valid_tasks(tasks: &[ScoreEntry]) -> impl Iterator<Item = &ScoreEntry> {
    tasks.iter().filter(|t| t.valid_score().is_some())
}

/// Positive scores from an exam list.
pub fn valid_exam_scores<E: RawScore>(exam_scores: &[E]) -> Vec<f64> {
    exam_scores.iter().filter_map(|e| positive(e.raw())).collect()
}

/// Average of the task pool, or `None` if it has no valid entries.
///
/// Uses the weighted mean only when every valid entry has a positive weight;
/// a single missing weight drops the whole pool to the plain mean.
pub fn task_pool_average(tasks: &[ScoreEntry]) -> Option<f64> {
    let valid: Vec<(f64, Option<f64>)> = tasks
        .iter()
        .filter_map(|t| t.valid_score().map(|s| (s, t.positive_weight())))
        .collect();

    if valid.is_empty() {
        return None;
    }

    let weights: Option<Vec<f64>> = valid.iter().map(|(_, w)| *w).collect();
    match weights {
        Some(raw) => {
            let normalized = normalize_weights(&raw);
            Some(
                valid
                    .iter()
                    .zip(normalized)
                    .map(|((score, _), weight)| score * weight)
                    .sum(),
            )
        }
        None => Some(valid.iter().map(|(s, _)| s).sum::<f64>() / valid.len() as f64),
    }
}

/// Unweighted average of the exam pool, or `None` if it is empty.
pub fn exam_pool_average<E: RawScore>(exam_scores: &[E]) -> Option<f64> {
    let valid = valid_exam_scores(exam_scores);
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

/// Combine the task and exam pools according to `policy`.
///
/// `task_weight_fraction` is only consulted under `TasksAndExam` when both
/// pools are non-empty; a mixed policy with one empty pool degrades to the
/// other pool's average.
pub fn compute_average<E: RawScore>(
    policy: EvaluationPolicy,
    tasks: &[ScoreEntry],
    exam_scores: &[E],
    task_weight_fraction: f64,
) -> Result<f64, EvaluationError> {
    let task_avg = task_pool_average(tasks);
    let exam_avg = exam_pool_average(exam_scores);

    let insufficient = |missing| EvaluationError::InputInsufficient { policy, missing };

    let average = match policy {
        EvaluationPolicy::TasksOnly => task_avg.ok_or_else(|| insufficient(MissingPool::Tasks))?,
        EvaluationPolicy::ExamOnly => exam_avg.ok_or_else(|| insufficient(MissingPool::Exams))?,
        EvaluationPolicy::TasksAndExam => match (task_avg, exam_avg) {
            (Some(t), Some(e)) => {
                if !(0.0..=1.0).contains(&task_weight_fraction) {
                    return Err(EvaluationError::InvalidTaskWeightFraction(
                        task_weight_fraction,
                    ));
                }
                t * task_weight_fraction + e * (1.0 - task_weight_fraction)
            }
            (Some(t), None) => t,
            (None, Some(e)) => e,
            (None, None) => return Err(insufficient(MissingPool::TasksAndExams)),
        },
    };

    tracing::debug!(
        %policy,
        task_avg = ?task_avg,
        exam_avg = ?exam_avg,
        average,
        "computed average"
    );

    Ok(average)
}

/// Sentence shown to the student for a computed average.
pub fn result_text(name: &str, average: f64, passed: bool) -> String {
    if passed {
        format!("Congratulations {name}! You passed with an average of {average:.2}.")
    } else {
        format!("Sorry {name}, you did not pass. Your average is {average:.2}.")
    }
}

/// Compute the average and the pass/fail verdict for one evaluation.
pub fn evaluate<E: RawScore>(
    name: &str,
    policy: EvaluationPolicy,
    tasks: &[ScoreEntry],
    exam_scores: &[E],
    task_weight_fraction: f64,
) -> Result<Evaluation, EvaluationError> {
    let average = compute_average(policy, tasks, exam_scores, task_weight_fraction)?;
    let passed = average >= PASS_THRESHOLD;

    Ok(Evaluation {
        average,
        passed,
        result_text: result_text(name, average, passed),
    })
}
