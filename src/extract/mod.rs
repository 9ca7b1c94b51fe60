//! Extraction of modified functions from a changeset
//!
//! Correlates the line-level facts of each file's patch with the function
//! boundaries reported by tree-sitter, and produces one record per function
//! that actually contains a changed line.

use crate::config::Config;
use crate::diff;
use crate::parser::Parser;
use crate::provider::{ChangeStatus, ModifiedFile, Provider};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Whether an extracted function is new or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
        }
    }
}

/// A function that was modified in a PR/MR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFunction {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Full source text of the function, for review context
    pub content: String,
    /// The portion of the file's patch scoped to this function; empty when
    /// no diff lines could be attributed to it
    pub diff: String,
    pub file_path: String,
    pub language: String,
    pub change_type: ChangeType,
}

/// Extracts modified functions from PR/MR files
pub struct Extractor {
    parser: Parser,
    config: Config,
}

impl Extractor {
    /// Create a new extractor
    pub fn new(config: Config) -> Self {
        Self {
            parser: Parser::new(),
            config,
        }
    }

    /// Extract all functions that have modified lines, across a batch of
    /// files
    ///
    /// Deleted files, config-ignored paths, and unsupported file types are
    /// skipped. A failure on one file is logged and never aborts the batch.
    pub async fn extract_modified_functions(
        &mut self,
        provider: &dyn Provider,
        files: &[ModifiedFile],
    ) -> Vec<ExtractedFunction> {
        let mut result = Vec::new();

        for file in files {
            // Deleted files have no new-file content to correlate against
            if file.status == ChangeStatus::Deleted {
                continue;
            }

            if self.config.should_ignore(&file.path) {
                tracing::debug!(path = %file.path, "skipping ignored file");
                continue;
            }

            if !self.parser.is_supported(&file.path) {
                continue;
            }

            let content = match provider.get_file_content(&file.path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "failed to fetch file content");
                    continue;
                }
            };

            match self.extract_from_file(file, &content) {
                Ok(functions) => result.extend(functions),
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "failed to extract functions");
                }
            }
        }

        result
    }

    /// Extract the modified functions of a single file
    pub fn extract_from_file(
        &mut self,
        file: &ModifiedFile,
        content: &str,
    ) -> Result<Vec<ExtractedFunction>> {
        let modified_lines = diff::parse_patch(&file.patch)
            .with_context(|| format!("failed to parse patch for {}", file.path))?;

        let (mut boundaries, language) = self
            .parser
            .parse(&file.path, content)
            .with_context(|| format!("failed to parse {}", file.path))?;

        // Tree-sitter traversal order is not part of the contract; sort so
        // output order is deterministic.
        boundaries.sort_by_key(|b| (b.start_line, b.end_line));

        let change_type = if file.status == ChangeStatus::Added {
            ChangeType::Added
        } else {
            ChangeType::Modified
        };

        let mut result = Vec::new();
        for boundary in boundaries {
            if !modified_lines.has_modified_line_in_range(boundary.start_line, boundary.end_line) {
                continue;
            }

            let fn_diff =
                diff::extract_diff_for_range(&file.patch, boundary.start_line, boundary.end_line);

            result.push(ExtractedFunction {
                name: boundary.name,
                start_line: boundary.start_line,
                end_line: boundary.end_line,
                content: boundary.content,
                diff: fn_diff,
                file_path: file.path.clone(),
                language: language.to_string(),
                change_type,
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ExistingComment, ReviewComment};
    use std::collections::HashMap;

    /// In-memory provider serving fixed file contents
    struct MockProvider {
        contents: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl crate::provider::Provider for MockProvider {
        async fn get_modified_files(&mut self, _number: u64) -> Result<Vec<ModifiedFile>> {
            Ok(Vec::new())
        }

        async fn get_file_content(&self, path: &str) -> Result<String> {
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no content for {}", path))
        }

        async fn post_comment(&self, _number: u64, _body: &str) -> Result<()> {
            Ok(())
        }

        async fn create_review(&self, _number: u64, _comments: &[ReviewComment]) -> Result<()> {
            Ok(())
        }

        async fn get_review_comments(&self, _number: u64) -> Result<Vec<ExistingComment>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_batch_skips_deleted_and_survives_fetch_failures() {
        let provider = MockProvider {
            contents: HashMap::from([(
                "src/ok.rs".to_string(),
                "fn touched() {\n    let x = 2;\n}\n".to_string(),
            )]),
        };

        let files = vec![
            modified_file(
                "src/ok.rs",
                ChangeStatus::Modified,
                "@@ -1,3 +1,3 @@\n fn touched() {\n-    let x = 1;\n+    let x = 2;\n }",
            ),
            // Content fetch fails; must not abort the batch
            modified_file("src/missing.rs", ChangeStatus::Modified, "@@ -1 +1 @@\n+x"),
            modified_file("src/gone.rs", ChangeStatus::Deleted, ""),
            // Unsupported extension is skipped without a fetch
            modified_file("README.md", ChangeStatus::Modified, "@@ -1 +1 @@\n+x"),
        ];

        let mut extractor = Extractor::new(Config::default());
        let functions = extractor
            .extract_modified_functions(&provider, &files)
            .await;

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "touched");
        assert_eq!(functions[0].file_path, "src/ok.rs");
    }

    fn modified_file(path: &str, status: ChangeStatus, patch: &str) -> ModifiedFile {
        ModifiedFile {
            path: path.to_string(),
            old_path: None,
            status,
            patch: patch.to_string(),
        }
    }

    #[test]
    fn test_extract_touched_function() {
        let mut extractor = Extractor::new(Config::default());
        let content = "fn touched() {\n    let x = 2;\n}\n\nfn untouched() {\n    let y = 1;\n}\n";
        let patch = "@@ -1,3 +1,3 @@\n fn touched() {\n-    let x = 1;\n+    let x = 2;\n }";
        let file = modified_file("src/lib.rs", ChangeStatus::Modified, patch);

        let functions = extractor.extract_from_file(&file, content).unwrap();

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "touched");
        assert_eq!(functions[0].change_type, ChangeType::Modified);
        assert_eq!(functions[0].language, "rust");
        assert_eq!(functions[0].diff, "-    let x = 1;\n+    let x = 2;");
    }

    #[test]
    fn test_added_file_yields_added_change_type() {
        let mut extractor = Extractor::new(Config::default());
        let content = "fn fresh() {\n    println!(\"new\");\n}\n";
        let patch = "@@ -0,0 +1,3 @@\n+fn fresh() {\n+    println!(\"new\");\n+}";
        let file = modified_file("src/new.rs", ChangeStatus::Added, patch);

        let functions = extractor.extract_from_file(&file, content).unwrap();

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].change_type, ChangeType::Added);
        assert_eq!(functions[0].start_line, 1);
        assert_eq!(functions[0].end_line, 3);
    }

    #[test]
    fn test_untouched_functions_are_skipped() {
        let mut extractor = Extractor::new(Config::default());
        let content = "fn one() {\n    let a = 1;\n}\n\nfn two() {\n    let b = 3;\n}\n";
        // Only `two` (lines 5-7) contains an added line
        let patch = "@@ -5,3 +5,3 @@\n fn two() {\n-    let b = 2;\n+    let b = 3;\n }";
        let file = modified_file("src/lib.rs", ChangeStatus::Modified, patch);

        let functions = extractor.extract_from_file(&file, content).unwrap();

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "two");
    }

    #[test]
    fn test_output_sorted_by_start_line() {
        let mut extractor = Extractor::new(Config::default());
        let content = "fn early() {\n    let a = 1;\n}\n\nfn late() {\n    let b = 1;\n}\n";
        let patch = "@@ -1,7 +1,7 @@\n fn early() {\n-    let a = 0;\n+    let a = 1;\n }\n \n fn late() {\n-    let b = 0;\n+    let b = 1;\n }";
        let file = modified_file("src/lib.rs", ChangeStatus::Modified, patch);

        let functions = extractor.extract_from_file(&file, content).unwrap();

        assert_eq!(functions.len(), 2);
        assert!(functions[0].start_line < functions[1].start_line);
    }

    #[test]
    fn test_malformed_patch_is_an_error_not_a_panic() {
        let mut extractor = Extractor::new(Config::default());
        let file = modified_file("src/lib.rs", ChangeStatus::Modified, "garbage");

        assert!(extractor.extract_from_file(&file, "fn x() {}").is_err());
    }

    #[test]
    fn test_empty_patch_yields_no_functions() {
        let mut extractor = Extractor::new(Config::default());
        let file = modified_file("src/lib.rs", ChangeStatus::Modified, "");

        let functions = extractor
            .extract_from_file(&file, "fn x() {\n    let y = 1;\n}")
            .unwrap();

        assert!(functions.is_empty());
    }
}
