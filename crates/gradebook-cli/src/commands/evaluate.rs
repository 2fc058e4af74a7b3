//! The `gradebook evaluate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::Gradebook;
use gradebook_store::config::load_config_from;

use super::{DraftArgs, OutputFormat};

pub fn execute(
    draft: DraftArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let draft = draft.into_draft(config.default_task_weight_fraction)?;

    let evaluation = Gradebook::evaluate_draft(&draft)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        OutputFormat::Text => {
            if !draft.subject_name.is_empty() {
                println!("Subject: {}", draft.subject_name);
            }
            println!("Policy:  {}", draft.policy);
            println!("Average: {:.2}", evaluation.average);
            let verdict = if evaluation.passed { "PASS" } else { "FAIL" };
            println!("Result:  {verdict}");
            println!("\n{}", evaluation.result_text);
        }
    }

    Ok(())
}
