//! GitLab REST provider

use super::{ChangeStatus, ExistingComment, ModifiedFile, Provider, ReviewComment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

const PER_PAGE: usize = 100;

/// Provider implementation for GitLab merge requests
pub struct GitLabProvider {
    client: reqwest::Client,
    base_url: String,
    /// URL-encoded `owner/repo` project id
    project_id: String,
    token: String,
    head_sha: Option<String>,
    diff_refs: Option<DiffRefs>,
}

impl GitLabProvider {
    /// Create a new GitLab provider for the given host (self-hosted
    /// instances included)
    pub fn new(host: &str, owner: &str, repo: &str, token: &str) -> Self {
        Self::with_base_url(&format!("https://{}/api/v4", host), owner, repo, token)
    }

    /// Create a provider against a custom API base URL
    pub fn with_base_url(base_url: &str, owner: &str, repo: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            // Subgroup owners carry slashes of their own; everything must be
            // percent-encoded, `/` included.
            project_id: urlencoding::encode(&format!("{}/{}", owner, repo)).into_owned(),
            token: token.to_string(),
            head_sha: None,
            diff_refs: None,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if !self.token.is_empty() {
            builder = builder.header("PRIVATE-TOKEN", self.token.clone());
        }
        builder
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("failed to {}: {} - {}", action, status, body);
        }
        Ok(response)
    }

    async fn fetch_merge_request(&self, number: u64) -> Result<MergeRequestResponse> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_url, self.project_id, number
        );
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        Self::check(response, "get merge request")
            .await?
            .json()
            .await
            .context("failed to parse merge request response")
    }
}

#[async_trait]
impl Provider for GitLabProvider {
    async fn get_modified_files(&mut self, number: u64) -> Result<Vec<ModifiedFile>> {
        let mr = self.fetch_merge_request(number).await?;
        self.head_sha = Some(mr.sha);
        self.diff_refs = mr.diff_refs;

        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/projects/{}/merge_requests/{}/diffs?per_page={}&page={}",
                self.base_url, self.project_id, number, PER_PAGE, page
            );
            let response = self.request(reqwest::Method::GET, &url).send().await?;
            let batch: Vec<MergeRequestDiff> = Self::check(response, "list merge request diffs")
                .await?
                .json()
                .await
                .context("failed to parse merge request diffs")?;

            let done = batch.len() < PER_PAGE;
            files.extend(batch.into_iter().map(MergeRequestDiff::into_modified_file));
            if done {
                break;
            }
            page += 1;
        }

        Ok(files)
    }

    async fn get_file_content(&self, path: &str) -> Result<String> {
        let head_sha = self
            .head_sha
            .as_deref()
            .context("head revision unknown; list modified files first")?;

        let url = format!(
            "{}/projects/{}/repository/files/{}/raw?ref={}",
            self.base_url,
            self.project_id,
            urlencoding::encode(path),
            head_sha
        );
        let response = self.request(reqwest::Method::GET, &url).send().await?;

        Self::check(response, "get file content")
            .await?
            .text()
            .await
            .context("failed to read file content")
    }

    async fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/notes",
            self.base_url, self.project_id, number
        );
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        Self::check(response, "post comment").await?;
        Ok(())
    }

    async fn create_review(&self, number: u64, comments: &[ReviewComment]) -> Result<()> {
        if comments.is_empty() {
            return Ok(());
        }

        let diff_refs = self
            .diff_refs
            .as_ref()
            .context("diff refs unknown; list modified files first")?;

        let url = format!(
            "{}/projects/{}/merge_requests/{}/discussions",
            self.base_url, self.project_id, number
        );

        // GitLab has no batched review endpoint; each comment is its own
        // discussion, and one misplaced position must not sink the rest.
        for comment in comments {
            let body = match &comment.suggestion {
                Some(code) => format!("{}\n\n```suggestion:-0+0\n{}\n```", comment.body, code),
                None => comment.body.clone(),
            };

            let payload = serde_json::json!({
                "body": body,
                "position": {
                    "base_sha": diff_refs.base_sha,
                    "start_sha": diff_refs.start_sha,
                    "head_sha": diff_refs.head_sha,
                    "position_type": "text",
                    "new_path": comment.path,
                    "new_line": comment.line,
                },
            });

            let response = self
                .request(reqwest::Method::POST, &url)
                .json(&payload)
                .send()
                .await?;

            if let Err(e) = Self::check(response, "create discussion").await {
                tracing::warn!(
                    path = %comment.path,
                    line = comment.line,
                    error = %e,
                    "failed to create discussion"
                );
            }
        }

        Ok(())
    }

    async fn get_review_comments(&self, number: u64) -> Result<Vec<ExistingComment>> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/projects/{}/merge_requests/{}/notes?per_page={}&page={}",
                self.base_url, self.project_id, number, PER_PAGE, page
            );
            let response = self.request(reqwest::Method::GET, &url).send().await?;
            let batch: Vec<Note> = Self::check(response, "list merge request notes")
                .await?
                .json()
                .await
                .context("failed to parse merge request notes")?;

            let done = batch.len() < PER_PAGE;
            comments.extend(batch.into_iter().map(|note| ExistingComment {
                path: note
                    .position
                    .as_ref()
                    .map(|p| p.new_path.clone())
                    .unwrap_or_default(),
                line: note.position.as_ref().and_then(|p| p.new_line),
                body: note.body,
            }));
            if done {
                break;
            }
            page += 1;
        }

        Ok(comments)
    }
}

// GitLab API types

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    sha: String,
    diff_refs: Option<DiffRefs>,
}

#[derive(Debug, Deserialize)]
struct DiffRefs {
    base_sha: String,
    start_sha: String,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestDiff {
    old_path: String,
    new_path: String,
    #[serde(default)]
    new_file: bool,
    #[serde(default)]
    deleted_file: bool,
    #[serde(default)]
    renamed_file: bool,
    #[serde(default)]
    diff: String,
}

impl MergeRequestDiff {
    fn into_modified_file(self) -> ModifiedFile {
        let status = if self.new_file {
            ChangeStatus::Added
        } else if self.deleted_file {
            ChangeStatus::Deleted
        } else if self.renamed_file {
            ChangeStatus::Renamed
        } else {
            ChangeStatus::Modified
        };

        ModifiedFile {
            old_path: (self.old_path != self.new_path).then_some(self.old_path),
            path: self.new_path,
            status,
            patch: self.diff,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Note {
    body: String,
    position: Option<NotePosition>,
}

#[derive(Debug, Deserialize)]
struct NotePosition {
    #[serde(default)]
    new_path: String,
    new_line: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_status_mapping() {
        let json = r#"{"old_path": "a.rs", "new_path": "a.rs", "new_file": false, "deleted_file": true, "renamed_file": false, "diff": ""}"#;
        let diff: MergeRequestDiff = serde_json::from_str(json).unwrap();
        assert_eq!(diff.into_modified_file().status, ChangeStatus::Deleted);
    }

    #[test]
    fn test_rename_keeps_old_path() {
        let json = r#"{"old_path": "old.rs", "new_path": "new.rs", "renamed_file": true, "diff": ""}"#;
        let diff: MergeRequestDiff = serde_json::from_str(json).unwrap();
        let file = diff.into_modified_file();

        assert_eq!(file.status, ChangeStatus::Renamed);
        assert_eq!(file.path, "new.rs");
        assert_eq!(file.old_path.as_deref(), Some("old.rs"));
    }

    #[test]
    fn test_note_without_position() {
        let json = r#"{"body": "general remark"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert!(note.position.is_none());
    }

    #[test]
    fn test_project_id_is_fully_encoded() {
        let provider = GitLabProvider::new("gitlab.com", "group/subgroup", "project", "t");
        assert_eq!(provider.project_id, "group%2Fsubgroup%2Fproject");

        let provider = GitLabProvider::new("gitlab.com", "my group", "repo", "t");
        assert_eq!(provider.project_id, "my%20group%2Frepo");
    }

    #[test]
    fn test_merge_request_diff_refs() {
        let json = r#"{"sha": "abc", "diff_refs": {"base_sha": "b", "start_sha": "s", "head_sha": "h"}}"#;
        let mr: MergeRequestResponse = serde_json::from_str(json).unwrap();
        assert_eq!(mr.diff_refs.unwrap().head_sha, "h");
    }
}
