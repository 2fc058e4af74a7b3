//! The `gradebook save` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::workflow::{DuplicateResolution, SubmissionOutcome};
use gradebook_core::Gradebook;
use gradebook_store::config::{create_store, load_config_from};

use super::{DraftArgs, IdentityArgs};

pub async fn execute(
    identity: IdentityArgs,
    draft: DraftArgs,
    on_duplicate: DuplicateResolution,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let draft = draft.into_draft(config.default_task_weight_fraction)?;
    let gradebook = Gradebook::new(create_store(&config.store)?);
    let user = identity.user();

    let outcome = gradebook.submit(&user, &draft, on_duplicate).await?;

    let record = outcome.record();
    match &outcome {
        SubmissionOutcome::Created(_) => println!("Created evaluation {}", record.id),
        SubmissionOutcome::Merged(_) => println!(
            "Merged into evaluation {} ({} tasks, {} exams)",
            record.id,
            record.tasks.len(),
            record.exam_scores.len()
        ),
    }
    println!("Average: {:.2}", record.average);
    println!("\n{}", record.result_text);

    Ok(())
}
