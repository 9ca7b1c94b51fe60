//! Command implementations

use super::ReviewArgs;
use crate::cache::{format_hash_marker, function_hash, Tracker};
use crate::ci::{self, CiProvider};
use crate::config::Config;
use crate::extract::Extractor;
use crate::llm::{review_functions, Client, LlmConfig, ProjectContext};
use crate::parser::Parser;
use crate::provider::{GitHubProvider, GitLabProvider, Provider, ReviewComment};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the review pipeline for the PR/MR of the current CI run
pub async fn run_review(args: &ReviewArgs, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load()?,
    };

    let env = ci::detect().context("CI detection failed")?;
    println!("Detected {} CI environment", env.provider);
    println!("Repository: {}/{}, PR/MR: #{}", env.owner, env.repo, env.number);

    let mut provider: Box<dyn Provider> = match env.provider {
        CiProvider::GitHub => Box::new(GitHubProvider::new(&env.owner, &env.repo, &env.token)),
        CiProvider::GitLab => Box::new(GitLabProvider::new(
            &env.server_host,
            &env.owner,
            &env.repo,
            &env.token,
        )),
    };

    println!("Fetching modified files...");
    let files = provider
        .get_modified_files(env.number)
        .await
        .context("failed to get modified files")?;
    println!("Found {} modified files", files.len());

    let mut extractor = Extractor::new(config.clone());
    let functions = extractor
        .extract_modified_functions(provider.as_ref(), &files)
        .await;
    println!("Extracted {} modified functions", functions.len());

    if functions.is_empty() {
        println!("No functions to review");
        return Ok(());
    }

    let to_review = if args.force {
        println!("Force flag set - reviewing all modified functions");
        functions
    } else {
        println!("Checking for previously reviewed functions...");
        match provider.get_review_comments(env.number).await {
            Ok(existing) => {
                let mut tracker = Tracker::new();
                tracker.load_from_comments(&existing);

                let total = functions.len();
                let unreviewed = tracker.filter_unreviewed(functions);
                let skipped = total - unreviewed.len();
                if skipped > 0 {
                    println!("Skipped {} already reviewed functions", skipped);
                }
                unreviewed
            }
            // Not fatal; worst case everything is reviewed again
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch existing comments");
                functions
            }
        }
    };

    if to_review.is_empty() {
        println!("All modified functions have already been reviewed");
        return Ok(());
    }

    let client = Client::new(LlmConfig {
        base_url: args.llm_base_url.clone(),
        model: args.llm_model.clone(),
        api_key: Some(args.llm_api_key.clone()),
    });

    let project_context = ProjectContext::collect(Path::new("."), &config.context);
    let context = (!project_context.is_empty()).then_some(project_context.description.as_str());

    println!(
        "Reviewing {} functions with LLM ({})...",
        to_review.len(),
        client.model()
    );
    let results = review_functions(&client, to_review, context, &config.rules).await;

    let mut comments = Vec::new();
    for result in &results {
        if let Some(ref e) = result.error {
            tracing::warn!(
                function = %result.function.name,
                path = %result.function.file_path,
                error = %e,
                "review failed for function"
            );
            continue;
        }
        if !result.has_issues() {
            continue;
        }

        let marker = format_hash_marker(&function_hash(&result.function));
        for suggestion in &result.suggestions {
            comments.push(ReviewComment {
                path: result.function.file_path.clone(),
                line: suggestion.line,
                // The marker makes the next run recognize this function as
                // already reviewed
                body: format!("{}\n\n{}", suggestion.description, marker),
                suggestion: (!suggestion.code.is_empty()).then(|| suggestion.code.clone()),
            });
        }
    }

    println!(
        "Found {} issues (out of {} functions reviewed)",
        comments.len(),
        results.len()
    );

    if comments.is_empty() {
        println!("No issues found, skipping review");
        return Ok(());
    }

    if args.dry_run {
        println!("Dry run - not posting the following comments:");
        for comment in &comments {
            println!("\n--- {}:{} ---\n{}", comment.path, comment.line, comment.body);
        }
        return Ok(());
    }

    println!("Posting review with inline suggestions...");
    provider
        .create_review(env.number, &comments)
        .await
        .context("failed to create review")?;

    println!("Review posted successfully!");
    Ok(())
}

/// Print the supported languages and their file extensions
pub fn languages() {
    let parser = Parser::new();
    println!("Supported file extensions:");
    for extension in parser.supported_extensions() {
        println!("  .{}", extension);
    }
}
