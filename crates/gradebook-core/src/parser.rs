//! TOML draft parser.
//!
//! Loads evaluation drafts from TOML files and directories, and validates
//! them before they reach the engine.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::{valid_exam_scores, valid_tasks};
use crate::model::{default_task_weight_fraction, EvaluationDraft, EvaluationPolicy, ScoreEntry};

/// Highest score accepted at entry time.
pub const MAX_SCORE: f64 = 100.0;

/// Scores above this are likely on the 0-100 scale, not the 0-10 scale the
/// pass threshold assumes.
pub const DISPLAY_SCALE_MAX: f64 = 10.0;

/// Intermediate TOML structure for parsing draft files.
#[derive(Debug, Deserialize)]
struct TomlDraftFile {
    evaluation: TomlEvaluationHeader,
    #[serde(default)]
    tasks: Vec<TomlTask>,
    #[serde(default)]
    exams: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct TomlEvaluationHeader {
    #[serde(default)]
    student: String,
    subject: String,
    policy: String,
    #[serde(default = "default_task_weight_fraction")]
    task_weight_fraction: f64,
    #[serde(default)]
    owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlTask {
    #[serde(default)]
    title: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    weight: Option<f64>,
}

fn check_score(score: f64, what: &str) -> Result<()> {
    anyhow::ensure!(
        score.is_finite() && (0.0..=MAX_SCORE).contains(&score),
        "{what} score {score} is outside 0..={MAX_SCORE}"
    );
    Ok(())
}

/// Parse a single TOML file into an `EvaluationDraft`.
pub fn parse_draft(path: &Path) -> Result<EvaluationDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read draft file: {}", path.display()))?;

    parse_draft_str(&content, path)
}

/// Parse a TOML string into an `EvaluationDraft` (useful for testing).
pub fn parse_draft_str(content: &str, source_path: &Path) -> Result<EvaluationDraft> {
    let parsed: TomlDraftFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let policy: EvaluationPolicy = parsed
        .evaluation
        .policy
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let tasks = parsed
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            if let Some(score) = t.score {
                check_score(score, &format!("task {}", i + 1))?;
            }
            if let Some(weight) = t.weight {
                anyhow::ensure!(
                    weight.is_finite() && weight >= 0.0,
                    "task {} weight {weight} must be a non-negative number",
                    i + 1
                );
            }
            Ok(ScoreEntry {
                title: t.title,
                date_label: t.date,
                description: t.description,
                score: t.score,
                weight: t.weight,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (i, score) in parsed.exams.iter().enumerate() {
        check_score(*score, &format!("exam {}", i + 1))?;
    }

    Ok(EvaluationDraft {
        student_name: parsed.evaluation.student,
        subject_name: parsed.evaluation.subject,
        policy,
        tasks,
        exam_scores: parsed.exams.into_iter().map(Some).collect(),
        task_weight_fraction: parsed.evaluation.task_weight_fraction,
        owner_id: parsed.evaluation.owner_id,
    })
}

/// Recursively load all `.toml` drafts from a directory.
pub fn load_draft_directory(dir: &Path) -> Result<Vec<EvaluationDraft>> {
    let mut drafts = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            drafts.extend(load_draft_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_draft(&path) {
                Ok(draft) => drafts.push(draft),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(drafts)
}

/// A warning from draft validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The field the warning is about, if any (e.g. "tasks[2]").
    pub field: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a draft for likely mistakes. Does not reject anything.
pub fn validate_draft(draft: &EvaluationDraft) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: Option<String>, message: String| {
        warnings.push(ValidationWarning { field, message });
    };

    if draft.subject_name.trim().is_empty() {
        warn(Some("subject".into()), "subject name is empty".into());
    }

    let task_count = valid_tasks(&draft.tasks).count();
    let exam_count = valid_exam_scores(&draft.exam_scores).len();

    match draft.policy {
        EvaluationPolicy::TasksOnly if task_count == 0 => warn(
            Some("tasks".into()),
            "tasks-only evaluation has no task scores greater than 0".into(),
        ),
        EvaluationPolicy::ExamOnly if exam_count == 0 => warn(
            Some("exams".into()),
            "exam-only evaluation has no exam scores greater than 0".into(),
        ),
        EvaluationPolicy::TasksAndExam if task_count == 0 && exam_count == 0 => warn(
            None,
            "tasks+exam evaluation has no task or exam scores greater than 0".into(),
        ),
        EvaluationPolicy::TasksAndExam if task_count == 0 || exam_count == 0 => warn(
            None,
            "tasks+exam evaluation has only one pool; that pool's average is used alone"
                .into(),
        ),
        _ => {}
    }

    let weighted = valid_tasks(&draft.tasks)
        .filter(|t| t.positive_weight().is_some())
        .count();
    if weighted > 0 && weighted < task_count {
        warn(
            Some("tasks".into()),
            format!(
                "{weighted} of {task_count} tasks have weights; \
                 the plain mean will be used"
            ),
        );
    }

    for (i, task) in draft.tasks.iter().enumerate() {
        if let Some(score) = task.valid_score() {
            if score > DISPLAY_SCALE_MAX {
                warn(
                    Some(format!("tasks[{}]", i + 1)),
                    format!(
                        "score {score} is above {DISPLAY_SCALE_MAX}; \
                         the pass threshold assumes a 0-10 scale"
                    ),
                );
            }
        }
    }

    for (i, score) in valid_exam_scores(&draft.exam_scores).iter().enumerate() {
        if *score > DISPLAY_SCALE_MAX {
            warn(
                Some(format!("exams[{}]", i + 1)),
                format!(
                    "score {score} is above {DISPLAY_SCALE_MAX}; \
                     the pass threshold assumes a 0-10 scale"
                ),
            );
        }
    }

    if draft.policy.uses_task_weight_fraction() {
        if !(0.0..=1.0).contains(&draft.task_weight_fraction) {
            warn(
                Some("task_weight_fraction".into()),
                format!(
                    "task weight fraction {} is outside 0..=1",
                    draft.task_weight_fraction
                ),
            );
        }
    } else if draft.task_weight_fraction != default_task_weight_fraction() {
        warn(
            Some("task_weight_fraction".into()),
            format!("task weight fraction is ignored for {} evaluations", draft.policy),
        );
    }

    warnings
}
