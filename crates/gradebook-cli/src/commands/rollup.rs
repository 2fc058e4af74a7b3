//! The `gradebook rollup` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_gradebook, IdentityArgs, OutputFormat};

pub async fn execute(
    identity: IdentityArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let gradebook = open_gradebook(config_path.as_deref())?;
    let rollups = gradebook.rollup(&identity.user()).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rollups)?);
        return Ok(());
    }

    if rollups.is_empty() {
        println!("No evaluations found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Policy", "Average", "Evaluations", "Failing"]);
    for group in &rollups {
        table.add_row(vec![
            Cell::new(&group.subject_name),
            Cell::new(group.policy),
            Cell::new(format!("{:.2}", group.average)),
            Cell::new(group.count),
            Cell::new(group.failing_count()),
        ]);
    }
    println!("{table}");

    for group in rollups.iter().filter(|g| g.failing_count() > 0) {
        println!("\nFailing in {} ({}):", group.subject_name, group.policy);
        for f in &group.failing {
            println!("  {} {:.2} [{}]", f.student_name, f.average, f.record_id);
        }
    }

    Ok(())
}
