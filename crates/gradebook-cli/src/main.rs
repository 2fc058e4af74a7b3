//! gradebook CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use gradebook_core::workflow::DuplicateResolution;

mod commands;

use commands::{DraftArgs, IdentityArgs, OutputFormat};

#[derive(Parser)]
#[command(
    name = "gradebook",
    version,
    about = "Grade evaluation and aggregation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and an example draft
    Init,

    /// Validate draft TOML files
    Validate {
        /// Path to a draft file or directory
        #[arg(long)]
        draft: PathBuf,
    },

    /// Compute an evaluation without saving it
    Evaluate {
        #[command(flatten)]
        draft: DraftArgs,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate a draft and save it to the store
    Save {
        #[command(flatten)]
        identity: IdentityArgs,

        #[command(flatten)]
        draft: DraftArgs,

        /// What to do when a record for the same subject and policy exists: merge, new
        #[arg(long, default_value = "merge")]
        on_duplicate: DuplicateResolution,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List saved evaluations visible to the user
    History {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Per-subject averages and failing students (teachers only)
    Rollup {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replace the scores of a saved evaluation
    Edit {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Evaluation id
        #[arg(long)]
        id: String,

        #[command(flatten)]
        draft: DraftArgs,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a saved evaluation
    Delete {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Evaluation id
        #[arg(long)]
        id: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gradebook=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { draft } => commands::validate::execute(draft),
        Commands::Evaluate {
            draft,
            format,
            config,
        } => commands::evaluate::execute(draft, format, config),
        Commands::Save {
            identity,
            draft,
            on_duplicate,
            config,
        } => commands::save::execute(identity, draft, on_duplicate, config).await,
        Commands::History {
            identity,
            format,
            config,
        } => commands::history::execute(identity, format, config).await,
        Commands::Rollup {
            identity,
            format,
            config,
        } => commands::rollup::execute(identity, format, config).await,
        Commands::Edit {
            identity,
            id,
            draft,
            config,
        } => commands::edit::execute(identity, id, draft, config).await,
        Commands::Delete {
            identity,
            id,
            config,
        } => commands::delete::execute(identity, id, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
