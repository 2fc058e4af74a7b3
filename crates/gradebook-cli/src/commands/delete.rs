//! The `gradebook delete` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{open_gradebook, IdentityArgs};

pub async fn execute(
    identity: IdentityArgs,
    id: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let gradebook = open_gradebook(config_path.as_deref())?;
    gradebook.delete(&identity.user(), &id).await?;
    println!("Deleted evaluation {id}");
    Ok(())
}
