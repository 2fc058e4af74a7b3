//! The `gradebook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradebook.toml").exists() {
        println!("gradebook.toml already exists, skipping.");
    } else {
        std::fs::write("gradebook.toml", SAMPLE_CONFIG)?;
        println!("Created gradebook.toml");
    }

    std::fs::create_dir_all("drafts")?;
    let example_path = std::path::Path::new("drafts/example.toml");
    if example_path.exists() {
        println!("drafts/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DRAFT)?;
        println!("Created drafts/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit drafts/example.toml with real scores");
    println!("  2. Run: gradebook validate --draft drafts/example.toml");
    println!("  3. Run: gradebook save --draft drafts/example.toml --user-id <your id>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradebook configuration

# Task share of the combined average for tasks+exam drafts given inline.
default_task_weight_fraction = 0.5

[store]
type = "file"
path = "./gradebook-data/evaluations.json"

# Remote document API instead of a local file:
# [store]
# type = "http"
# base_url = "https://grades.example.com/api"
# api_key = "${GRADEBOOK_API_KEY}"
# timeout_secs = 30
"#;

const EXAMPLE_DRAFT: &str = r#"# Exam scores go before the tables.
exams = [5.0]

[evaluation]
student = "Ana"
subject = "Math"
policy = "tasks+exam"
task_weight_fraction = 0.4

[[tasks]]
title = "Homework 1"
date = "week 1"
score = 8.0

[[tasks]]
title = "Homework 2"
date = "week 2"
score = 6.0
"#;
