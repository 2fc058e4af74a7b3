//! The `gradebook validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::parser;

pub fn execute(draft_path: PathBuf) -> Result<()> {
    let drafts = if draft_path.is_dir() {
        parser::load_draft_directory(&draft_path)?
    } else {
        vec![parser::parse_draft(&draft_path)?]
    };

    let mut total_warnings = 0;

    for draft in &drafts {
        println!(
            "Draft: {} / {} ({}, {} tasks, {} exams)",
            draft.subject_name,
            draft.student_name,
            draft.policy,
            draft.tasks.len(),
            draft.exam_scores.len()
        );

        let warnings = parser::validate_draft(draft);
        for w in &warnings {
            let prefix = w
                .field
                .as_ref()
                .map(|field| format!("  [{field}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All drafts valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
