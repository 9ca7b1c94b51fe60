//! AInspector - AI-powered code review tool
//!
//! Runs inside GitHub Actions or GitLab CI, extracts the functions a PR/MR
//! actually modified, reviews them with an LLM, and posts inline comments
//! that are never duplicated across runs.

use ainspector::cli::{languages, run_review, Cli, Commands};
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Review(args) => {
            run_review(&args, cli.config.as_deref()).await?;
        }

        Commands::Languages => {
            languages();
        }
    }

    Ok(())
}
