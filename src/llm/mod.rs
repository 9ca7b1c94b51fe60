//! LLM review stage
//!
//! Sends each extracted function to the model with a language-aware prompt
//! and parses the structured response into line-anchored suggestions.

mod client;
pub mod prompts;

pub use client::{ChatMessage, Client, LlmConfig};

use crate::config::ContextConfig;
use crate::extract::ExtractedFunction;
use prompts::{build_system_prompt, build_user_prompt, LGTM_MARKER};
use serde::Deserialize;
use std::path::Path;

/// Attempts per function before its failure is recorded
const MAX_ATTEMPTS: usize = 3;

/// A code suggestion for a specific issue
#[derive(Debug, Clone, Deserialize)]
pub struct Suggestion {
    pub line: usize,
    pub description: String,
    #[serde(rename = "suggestion", default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    issues: Vec<Suggestion>,
}

/// The review outcome for one function
#[derive(Debug)]
pub struct ReviewResult {
    pub function: ExtractedFunction,
    pub suggestions: Vec<Suggestion>,
    /// Original response, kept for debugging
    pub raw_review: String,
    pub error: Option<anyhow::Error>,
}

impl ReviewResult {
    /// True if the review contains actual issues to report
    ///
    /// An LGTM response or a failed request both count as "nothing to post".
    pub fn has_issues(&self) -> bool {
        self.error.is_none() && !self.suggestions.is_empty()
    }
}

/// Review each function with the LLM
///
/// A request failure for one function is captured in its result and never
/// stops the others.
pub async fn review_functions(
    client: &Client,
    functions: Vec<ExtractedFunction>,
    project_context: Option<&str>,
    extra_rules: &[String],
) -> Vec<ReviewResult> {
    let mut results = Vec::with_capacity(functions.len());

    for function in functions {
        let messages = [
            ChatMessage::system(build_system_prompt(
                &function.language,
                project_context,
                extra_rules,
            )),
            ChatMessage::user(build_user_prompt(&function)),
        ];

        match client.complete_with_retry(&messages, MAX_ATTEMPTS).await {
            Ok(review) => {
                let suggestions = parse_review_response(&review);
                results.push(ReviewResult {
                    function,
                    suggestions,
                    raw_review: review,
                    error: None,
                });
            }
            Err(e) => {
                results.push(ReviewResult {
                    function,
                    suggestions: Vec::new(),
                    raw_review: String::new(),
                    error: Some(e),
                });
            }
        }
    }

    results
}

/// Parse the LLM response into structured suggestions
///
/// `LGTM` and anything unparseable both mean "no issues"; models sometimes
/// wrap the JSON in prose, so a brace-delimited slice is tried before
/// giving up.
fn parse_review_response(response: &str) -> Vec<Suggestion> {
    let trimmed = response.trim();

    if trimmed == LGTM_MARKER {
        return Vec::new();
    }

    if let Ok(parsed) = serde_json::from_str::<ReviewResponse>(trimmed) {
        return parsed.issues;
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            if let Ok(parsed) = serde_json::from_str::<ReviewResponse>(&trimmed[start..=end]) {
                return parsed.issues;
            }
        }
    }

    Vec::new()
}

/// Project context sent alongside every review prompt
#[derive(Debug, Default)]
pub struct ProjectContext {
    /// Raw contents of the config-selected files
    pub description: String,
}

impl ProjectContext {
    /// Collect context files under `root` per the `[context]` configuration
    ///
    /// Files are concatenated in path order for deterministic output;
    /// unreadable files are skipped with a warning.
    pub fn collect(root: &Path, config: &ContextConfig) -> Self {
        if config.include.is_empty() {
            return Self::default();
        }

        let mut entries: Vec<(String, String)> = Vec::new();

        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = match entry.path().strip_prefix(root) {
                Ok(p) => p.to_string_lossy().to_string(),
                Err(_) => continue,
            };

            if !config.matches(&relative) {
                continue;
            }

            match std::fs::read_to_string(entry.path()) {
                Ok(content) => entries.push((relative, content)),
                Err(e) => {
                    tracing::warn!(path = %relative, error = %e, "failed to read context file");
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut description = String::new();
        for (path, content) in entries {
            description.push_str(&format!("=== {} ===\n{}\n\n", path, content));
        }

        Self { description }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
    }
}
