//! Core data model types for gradebook.
//!
//! These are the types shared by the engine, the history aggregator, the
//! store adapters, and the CLI: score entries, policies, drafts, and the
//! persisted evaluation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One task's input as entered in a form row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Task title. Empty titles are relabeled when merged.
    #[serde(default)]
    pub title: String,
    /// Free-text date label; never parsed as a date.
    #[serde(default)]
    pub date_label: String,
    #[serde(default)]
    pub description: String,
    /// Score in [0, 100]. `None` is an unfilled row.
    #[serde(default)]
    pub score: Option<f64>,
    /// Individual task weight. `None` or zero disables weighting for the pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ScoreEntry {
    /// An untitled entry with only a score.
    pub fn scored(score: f64) -> Self {
        Self {
            title: String::new(),
            date_label: String::new(),
            description: String::new(),
            score: Some(score),
            weight: None,
        }
    }

    /// An untitled entry with a score and an individual weight.
    pub fn weighted(score: f64, weight: f64) -> Self {
        Self {
            weight: Some(weight),
            ..Self::scored(score)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The score if it counts towards an average (strictly positive and finite).
    pub fn valid_score(&self) -> Option<f64> {
        self.score.filter(|s| s.is_finite() && *s > 0.0)
    }

    /// The weight if it is strictly positive and finite.
    pub fn positive_weight(&self) -> Option<f64> {
        self.weight.filter(|w| w.is_finite() && *w > 0.0)
    }
}

/// Which score pools are required and how they combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationPolicy {
    TasksOnly,
    #[serde(rename = "tasks+exam", alias = "tasks-and-exam")]
    TasksAndExam,
    ExamOnly,
}

impl EvaluationPolicy {
    /// Whether the task/exam mix weight takes part in the computation.
    pub fn uses_task_weight_fraction(self) -> bool {
        matches!(self, EvaluationPolicy::TasksAndExam)
    }
}

impl fmt::Display for EvaluationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationPolicy::TasksOnly => write!(f, "tasks-only"),
            EvaluationPolicy::TasksAndExam => write!(f, "tasks+exam"),
            EvaluationPolicy::ExamOnly => write!(f, "exam-only"),
        }
    }
}

impl FromStr for EvaluationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tasks-only" | "tasks" => Ok(EvaluationPolicy::TasksOnly),
            "tasks+exam" | "tasks-and-exam" | "mixed" => Ok(EvaluationPolicy::TasksAndExam),
            "exam-only" | "exam" => Ok(EvaluationPolicy::ExamOnly),
            other => Err(format!("unknown evaluation policy: {other}")),
        }
    }
}

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "estudiante")]
    Student,
    #[serde(rename = "profesor")]
    Teacher,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "estudiante" => Ok(Role::Student),
            "teacher" | "profesor" => Ok(Role::Teacher),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated user, as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Caller-owned input for one evaluation. May contain placeholder rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub student_name: String,
    pub subject_name: String,
    pub policy: EvaluationPolicy,
    #[serde(default)]
    pub tasks: Vec<ScoreEntry>,
    #[serde(default)]
    pub exam_scores: Vec<Option<f64>>,
    /// Share of the combined average attributed to the task pool.
    #[serde(default = "default_task_weight_fraction")]
    pub task_weight_fraction: f64,
    /// Evaluated student when a teacher enters the record.
    #[serde(default)]
    pub owner_id: Option<String>,
}

pub fn default_task_weight_fraction() -> f64 {
    0.5
}

impl Default for EvaluationDraft {
    fn default() -> Self {
        Self {
            student_name: String::new(),
            subject_name: String::new(),
            policy: EvaluationPolicy::TasksOnly,
            tasks: Vec::new(),
            exam_scores: Vec::new(),
            task_weight_fraction: default_task_weight_fraction(),
            owner_id: None,
        }
    }
}

/// A persisted evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: String,
    /// The evaluated person.
    pub owner_id: String,
    /// Who created the record, when a teacher entered it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub subject_name: String,
    pub student_name: String,
    pub policy: EvaluationPolicy,
    pub result_text: String,
    pub average: f64,
    /// Only entries with a positive score.
    #[serde(default)]
    pub tasks: Vec<ScoreEntry>,
    /// Only positive exam scores.
    #[serde(default)]
    pub exam_scores: Vec<f64>,
    /// Present only under `TasksAndExam`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_weight_fraction: Option<f64>,
    /// Optimistic concurrency counter, bumped by the store on each update.
    #[serde(default = "initial_version")]
    pub version: u64,
}

fn initial_version() -> u64 {
    1
}

impl EvaluationRecord {
    /// Generate a fresh record identifier.
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Whether the stored average meets the pass threshold.
    pub fn passed(&self) -> bool {
        self.average >= crate::engine::PASS_THRESHOLD
    }

    /// Whether `user` may change or delete this record.
    pub fn editable_by(&self, user: &CurrentUser) -> bool {
        user.is_teacher()
            || self.owner_id == user.id
            || self.author_id.as_deref() == Some(user.id.as_str())
    }
}
