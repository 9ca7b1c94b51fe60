//! GitHub REST provider

use super::{ChangeStatus, ExistingComment, ModifiedFile, Provider, ReviewComment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

const MEDIA_TYPE_JSON: &str = "application/vnd.github+json";
/// Returns file bytes directly, no base64 envelope
const MEDIA_TYPE_RAW: &str = "application/vnd.github.raw+json";

/// Provider implementation for GitHub pull requests
pub struct GitHubProvider {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
    token: String,
    head_sha: Option<String>,
}

impl GitHubProvider {
    /// Create a new GitHub provider
    pub fn new(owner: &str, repo: &str, token: &str) -> Self {
        Self::with_base_url(API_BASE, owner, repo, token)
    }

    /// Create a provider against a custom API base URL
    pub fn with_base_url(base_url: &str, owner: &str, repo: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
            head_sha: None,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.request_with_accept(method, url, MEDIA_TYPE_JSON)
    }

    /// Build a request with exactly one `Accept` value; `header()` would
    /// append a second one and let the server pick the media type.
    fn request_with_accept(
        &self,
        method: reqwest::Method,
        url: &str,
        accept: &str,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("User-Agent", concat!("ainspector/", env!("CARGO_PKG_VERSION")))
            .header("Accept", accept);

        if !self.token.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.token));
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

    fn head_sha(&self) -> Result<&str> {
        self.head_sha
            .as_deref()
            .context("head revision unknown; list modified files first")
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    async fn get_modified_files(&mut self, number: u64) -> Result<Vec<ModifiedFile>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_url, self.owner, self.repo, number
        );
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let pull: PullResponse = Self::check(response, "get pull request")
            .await?
            .json()
            .await
            .context("failed to parse pull request response")?;
        self.head_sha = Some(pull.head.sha);

        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.base_url, self.owner, self.repo, number, PER_PAGE, page
            );
            let response = self.request(reqwest::Method::GET, &url).send().await?;
            let batch: Vec<PullFile> = Self::check(response, "list pull request files")
                .await?
                .json()
                .await
                .context("failed to parse pull request files")?;

            let done = batch.len() < PER_PAGE;
            files.extend(batch.into_iter().map(PullFile::into_modified_file));
            if done {
                break;
            }
            page += 1;
        }

        Ok(files)
    }

    async fn get_file_content(&self, path: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.base_url,
            self.owner,
            self.repo,
            encode_path(path),
            self.head_sha()?
        );

        let response = self
            .request_with_accept(reqwest::Method::GET, &url, MEDIA_TYPE_RAW)
            .send()
            .await?;

        Self::check(response, "get file content")
            .await?
            .text()
            .await
            .context("failed to read file content")
    }

    async fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, self.owner, self.repo, number
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

        let draft_comments: Vec<DraftReviewComment> = comments
            .iter()
            .map(|c| {
                let body = match &c.suggestion {
                    Some(code) => format!("{}\n\n```suggestion\n{}\n```", c.body, code),
                    None => c.body.clone(),
                };
                DraftReviewComment {
                    path: c.path.clone(),
                    line: c.line,
                    body,
                }
            })
            .collect();

        let review = ReviewRequest {
            commit_id: self.head_sha()?.to_string(),
            event: "COMMENT",
            comments: draft_comments,
        };

        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.base_url, self.owner, self.repo, number
        );
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&review)
            .send()
            .await?;

        Self::check(response, "create review").await?;
        Ok(())
    }

    async fn get_review_comments(&self, number: u64) -> Result<Vec<ExistingComment>> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/comments?per_page={}&page={}",
                self.base_url, self.owner, self.repo, number, PER_PAGE, page
            );
            let response = self.request(reqwest::Method::GET, &url).send().await?;
            let batch: Vec<PullComment> = Self::check(response, "list review comments")
                .await?
                .json()
                .await
                .context("failed to parse review comments")?;

            let done = batch.len() < PER_PAGE;
            comments.extend(batch.into_iter().map(|c| ExistingComment {
                path: c.path,
                line: c.line,
                body: c.body,
            }));
            if done {
                break;
            }
            page += 1;
        }

        Ok(comments)
    }
}

/// Percent-encode a repository path for use in a URL, keeping `/` as the
/// segment separator
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// GitHub API types

#[derive(Debug, Deserialize)]
struct PullResponse {
    head: PullHead,
}

#[derive(Debug, Deserialize)]
struct PullHead {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
    previous_filename: Option<String>,
    status: String,
    /// Absent for binary files
    patch: Option<String>,
}

impl PullFile {
    fn into_modified_file(self) -> ModifiedFile {
        let status = match self.status.as_str() {
            "added" | "copied" => ChangeStatus::Added,
            "removed" => ChangeStatus::Deleted,
            "renamed" => ChangeStatus::Renamed,
            _ => ChangeStatus::Modified,
        };

        ModifiedFile {
            path: self.filename,
            old_path: self.previous_filename,
            status,
            patch: self.patch.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PullComment {
    path: String,
    line: Option<usize>,
    body: String,
}

#[derive(Debug, Serialize)]
struct ReviewRequest {
    commit_id: String,
    event: &'static str,
    comments: Vec<DraftReviewComment>,
}

#[derive(Debug, Serialize)]
struct DraftReviewComment {
    path: String,
    line: usize,
    body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_file_status_mapping() {
        let json = r#"{"filename": "src/a.rs", "status": "removed", "patch": "@@ -1 +0,0 @@\n-gone"}"#;
        let file: PullFile = serde_json::from_str(json).unwrap();
        let modified = file.into_modified_file();

        assert_eq!(modified.status, ChangeStatus::Deleted);
        assert_eq!(modified.path, "src/a.rs");
        assert!(modified.patch.starts_with("@@"));
    }

    #[test]
    fn test_binary_file_has_empty_patch() {
        let json = r#"{"filename": "logo.png", "status": "added"}"#;
        let file: PullFile = serde_json::from_str(json).unwrap();
        let modified = file.into_modified_file();

        assert_eq!(modified.status, ChangeStatus::Added);
        assert_eq!(modified.patch, "");
    }

    #[test]
    fn test_unknown_status_defaults_to_modified() {
        let json = r#"{"filename": "a.rs", "status": "changed", "patch": ""}"#;
        let file: PullFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.into_modified_file().status, ChangeStatus::Modified);
    }

    #[test]
    fn test_raw_media_type_is_the_only_accept_value() {
        let provider = GitHubProvider::new("octo", "repo", "token");
        let request = provider
            .request_with_accept(
                reqwest::Method::GET,
                "https://api.github.com/repos/octo/repo/contents/src/a.rs",
                MEDIA_TYPE_RAW,
            )
            .build()
            .unwrap();

        let accepts: Vec<_> = request.headers().get_all("Accept").iter().collect();
        assert_eq!(accepts, vec![MEDIA_TYPE_RAW]);
    }

    #[test]
    fn test_json_requests_accept_json_only() {
        let provider = GitHubProvider::new("octo", "repo", "token");
        let request = provider
            .request(reqwest::Method::GET, "https://api.github.com/x")
            .build()
            .unwrap();

        let accepts: Vec<_> = request.headers().get_all("Accept").iter().collect();
        assert_eq!(accepts, vec![MEDIA_TYPE_JSON]);
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("src/main.rs"), "src/main.rs");
        assert_eq!(encode_path("docs/my file.md"), "docs/my%20file.md");
        assert_eq!(encode_path("notes/#1 plan.md"), "notes/%231%20plan.md");
    }

    #[test]
    fn test_review_request_shape() {
        let review = ReviewRequest {
            commit_id: "abc".to_string(),
            event: "COMMENT",
            comments: vec![DraftReviewComment {
                path: "src/a.rs".to_string(),
                line: 3,
                body: "issue".to_string(),
            }],
        };

        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["event"], "COMMENT");
        assert_eq!(json["comments"][0]["line"], 3);
    }
}
