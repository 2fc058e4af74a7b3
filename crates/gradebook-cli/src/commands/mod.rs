//! Subcommands and the argument groups they share.

pub mod delete;
pub mod edit;
pub mod evaluate;
pub mod history;
pub mod init;
pub mod rollup;
pub mod save;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use gradebook_core::model::{CurrentUser, EvaluationDraft, EvaluationPolicy, Role, ScoreEntry};
use gradebook_core::parser::{self, MAX_SCORE};
use gradebook_core::Gradebook;
use gradebook_store::config::{create_store, load_config_from};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Who is running the command.
#[derive(Debug, Clone, Args)]
pub struct IdentityArgs {
    /// User id
    #[arg(long, default_value = "local")]
    pub user_id: String,

    /// Display name (defaults to the user id)
    #[arg(long)]
    pub user_name: Option<String>,

    /// Role: student, teacher
    #[arg(long, default_value = "student")]
    pub role: Role,
}

impl IdentityArgs {
    pub fn user(&self) -> CurrentUser {
        CurrentUser {
            id: self.user_id.clone(),
            name: self
                .user_name
                .clone()
                .unwrap_or_else(|| self.user_id.clone()),
            role: self.role,
        }
    }
}

/// A draft given as a TOML file or inline flags.
#[derive(Debug, Clone, Default, Args)]
pub struct DraftArgs {
    /// Draft TOML file
    #[arg(
        long,
        conflicts_with_all = ["policy", "subject", "student", "tasks", "exams", "task_weight"]
    )]
    pub draft: Option<PathBuf>,

    /// Evaluation policy: tasks-only, tasks+exam, exam-only
    #[arg(long)]
    pub policy: Option<EvaluationPolicy>,

    /// Subject name
    #[arg(long)]
    pub subject: Option<String>,

    /// Student name shown in the result text
    #[arg(long)]
    pub student: Option<String>,

    /// Task scores, comma-separated; `score@weight` sets a weight (e.g. "8@2,6,10")
    #[arg(long, allow_hyphen_values = true)]
    pub tasks: Option<String>,

    /// Exam scores, comma-separated
    #[arg(long, allow_hyphen_values = true)]
    pub exams: Option<String>,

    /// Share of the task pool under tasks+exam (0..=1)
    #[arg(long)]
    pub task_weight: Option<f64>,

    /// Owner of the record when a teacher enters it for a student
    #[arg(long)]
    pub owner: Option<String>,
}

impl DraftArgs {
    /// Build a fresh draft. Inline drafts require `--policy`.
    pub fn into_draft(self, default_fraction: f64) -> Result<EvaluationDraft> {
        let mut draft = EvaluationDraft {
            task_weight_fraction: default_fraction,
            ..Default::default()
        };
        if self.draft.is_none() {
            let policy = self
                .policy
                .context("either --draft or --policy is required")?;
            draft.policy = policy;
        }
        self.apply_to(&mut draft)?;
        Ok(draft)
    }

    /// Overwrite `draft` with whatever was given.
    ///
    /// A draft file replaces everything; inline flags replace only the fields
    /// they name.
    pub fn apply_to(&self, draft: &mut EvaluationDraft) -> Result<()> {
        if let Some(path) = &self.draft {
            let owner = draft.owner_id.take();
            *draft = parser::parse_draft(path)?;
            if draft.owner_id.is_none() {
                draft.owner_id = owner;
            }
        }

        if let Some(policy) = self.policy {
            draft.policy = policy;
        }
        if let Some(subject) = &self.subject {
            draft.subject_name = subject.clone();
        }
        if let Some(student) = &self.student {
            draft.student_name = student.clone();
        }
        if let Some(tasks) = &self.tasks {
            draft.tasks = parse_task_list(tasks)?;
        }
        if let Some(exams) = &self.exams {
            draft.exam_scores = parse_score_list(exams)?;
        }
        if let Some(fraction) = self.task_weight {
            draft.task_weight_fraction = fraction;
        }
        if let Some(owner) = &self.owner {
            draft.owner_id = Some(owner.clone());
        }
        Ok(())
    }
}

fn parse_score(raw: &str) -> Result<f64> {
    let score: f64 = raw
        .parse()
        .with_context(|| format!("invalid score: {raw:?}"))?;
    anyhow::ensure!(
        score.is_finite() && (0.0..=MAX_SCORE).contains(&score),
        "score {score} is outside 0..={MAX_SCORE}"
    );
    Ok(score)
}

/// Parse "8,6,10" into exam scores. Empty items become placeholders.
pub fn parse_score_list(s: &str) -> Result<Vec<Option<f64>>> {
    s.split(',')
        .map(str::trim)
        .map(|item| {
            if item.is_empty() {
                Ok(None)
            } else {
                parse_score(item).map(Some)
            }
        })
        .collect()
}

/// Parse "8@2,6,10" into task entries.
pub fn parse_task_list(s: &str) -> Result<Vec<ScoreEntry>> {
    s.split(',')
        .map(str::trim)
        .map(|item| {
            if item.is_empty() {
                return Ok(ScoreEntry::default());
            }
            match item.split_once('@') {
                Some((score, weight)) => {
                    let weight: f64 = weight
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid weight in {item:?}"))?;
                    anyhow::ensure!(
                        weight.is_finite() && weight >= 0.0,
                        "weight {weight} must be a non-negative number"
                    );
                    Ok(ScoreEntry::weighted(parse_score(score.trim())?, weight))
                }
                None => Ok(ScoreEntry::scored(parse_score(item)?)),
            }
        })
        .collect()
}

/// Load the configuration and open the configured store.
pub fn open_gradebook(config_path: Option<&Path>) -> Result<Gradebook> {
    let config = load_config_from(config_path)?;
    let store = create_store(&config.store)?;
    Ok(Gradebook::new(store))
}
