//! CLI interface using clap

mod commands;

pub use commands::{languages, run_review};

use clap::{Parser, Subcommand};

/// AInspector - AI-powered code review for pull and merge requests
#[derive(Parser, Debug)]
#[command(name = "ainspector")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (defaults to ainspector.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review the pull/merge request of the current CI run
    Review(ReviewArgs),

    /// List the supported languages and file extensions
    Languages,
}

/// Arguments for the review command
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// Force re-review of all functions, ignoring previous markers
    #[arg(short, long)]
    pub force: bool,

    /// Print the review instead of posting it
    #[arg(long)]
    pub dry_run: bool,

    /// LLM API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com")]
    pub llm_base_url: String,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o")]
    pub llm_model: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "ainspector",
            "review",
            "--force",
            "--llm-api-key",
            "secret",
        ]);

        match cli.command {
            Commands::Review(args) => {
                assert!(args.force);
                assert!(!args.dry_run);
                assert_eq!(args.llm_model, "gpt-4o");
                assert_eq!(args.llm_base_url, "https://api.openai.com");
            }
            _ => panic!("expected review command"),
        }
    }

    #[test]
    fn test_languages_command() {
        let cli = Cli::parse_from(["ainspector", "languages"]);
        assert!(matches!(cli.command, Commands::Languages));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["ainspector", "-v", "languages"]);
        assert!(cli.verbose);
    }
}
