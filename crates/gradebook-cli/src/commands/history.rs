//! The `gradebook history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradebook_core::model::EvaluationRecord;

use super::{open_gradebook, IdentityArgs, OutputFormat};

pub async fn execute(
    identity: IdentityArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let gradebook = open_gradebook(config_path.as_deref())?;
    let records = gradebook.history(&identity.user()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text if records.is_empty() => println!("No evaluations found."),
        OutputFormat::Text => {
            println!("{}", history_table(&records));
            println!("{} evaluation(s)", records.len());
        }
    }

    Ok(())
}

fn history_table(records: &[EvaluationRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Id", "Date", "Subject", "Student", "Policy", "Tasks", "Exams", "Average", "Result",
    ]);

    for r in records {
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(r.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(&r.subject_name),
            Cell::new(&r.student_name),
            Cell::new(r.policy),
            Cell::new(r.tasks.len()),
            Cell::new(r.exam_scores.len()),
            Cell::new(format!("{:.2}", r.average)),
            Cell::new(if r.passed() { "PASS" } else { "FAIL" }),
        ]);
    }

    table
}
