//! The `gradebook edit` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::workflow::EditSession;
use gradebook_core::GradebookError;

use super::{open_gradebook, DraftArgs, IdentityArgs};

pub async fn execute(
    identity: IdentityArgs,
    id: String,
    draft: DraftArgs,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let gradebook = open_gradebook(config_path.as_deref())?;
    let user = identity.user();

    let record = gradebook
        .store()
        .get(&id)
        .await?
        .ok_or_else(|| GradebookError::NotFound(id.clone()))?;

    let mut session = EditSession::new();
    session.begin(record);
    if let Some(current) = session.draft_mut() {
        draft.apply_to(current)?;
    }

    let saved = session.save(&gradebook, &user).await?;
    println!("Updated evaluation {} (version {})", saved.id, saved.version);
    println!("Average: {:.2}", saved.average);
    println!("\n{}", saved.result_text);

    Ok(())
}
