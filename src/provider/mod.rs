//! Git hosting providers
//!
//! The rest of the tool talks to GitHub and GitLab through the [`Provider`]
//! trait: list the files of a PR/MR, fetch content at the head revision,
//! and read/post review comments.

mod github;
mod gitlab;

pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a file changed within a PR/MR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    /// GitHub reports deletions as `removed`
    #[serde(alias = "removed")]
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// A file that was modified in a PR/MR
#[derive(Debug, Clone)]
pub struct ModifiedFile {
    /// Current file path
    pub path: String,
    /// Previous path, for renames
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    /// Unified diff patch as returned by the hosting API
    pub patch: String,
}

/// An inline review comment to be posted, with an optional code suggestion
#[derive(Debug, Clone)]
pub struct ReviewComment {
    pub path: String,
    /// 1-based line number in the new file
    pub line: usize,
    pub body: String,
    /// Suggested replacement code, rendered as a suggestion block
    pub suggestion: Option<String>,
}

/// A review comment already posted on the PR/MR
#[derive(Debug, Clone)]
pub struct ExistingComment {
    pub path: String,
    pub line: Option<usize>,
    pub body: String,
}

/// Interface to a git hosting service
#[async_trait]
pub trait Provider: Send + Sync {
    /// List all files modified in the PR/MR, capturing the head revision
    async fn get_modified_files(&mut self, number: u64) -> Result<Vec<ModifiedFile>>;

    /// Fetch the content of a file at the PR/MR head
    async fn get_file_content(&self, path: &str) -> Result<String>;

    /// Post a general comment on the PR/MR
    async fn post_comment(&self, number: u64, body: &str) -> Result<()>;

    /// Create a review with inline comments on specific lines
    async fn create_review(&self, number: u64, comments: &[ReviewComment]) -> Result<()>;

    /// List all review comments already posted on the PR/MR
    async fn get_review_comments(&self, number: u64) -> Result<Vec<ExistingComment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_status_roundtrip() {
        let status: ChangeStatus = serde_json::from_str("\"added\"").unwrap();
        assert_eq!(status, ChangeStatus::Added);
        assert_eq!(status.to_string(), "added");
    }

    #[test]
    fn test_github_removed_maps_to_deleted() {
        let status: ChangeStatus = serde_json::from_str("\"removed\"").unwrap();
        assert_eq!(status, ChangeStatus::Deleted);
    }
}
