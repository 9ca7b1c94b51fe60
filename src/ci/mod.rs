//! CI environment detection
//!
//! The tool is meant to run inside GitHub Actions or GitLab CI; everything
//! it needs (repository, PR/MR number, token) is read from the environment
//! variables those systems set.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Which hosting service the CI run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiProvider {
    GitHub,
    GitLab,
}

impl std::fmt::Display for CiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CiProvider::GitHub => write!(f, "github"),
            CiProvider::GitLab => write!(f, "gitlab"),
        }
    }
}

/// The detected CI environment
#[derive(Debug, Clone)]
pub struct Environment {
    pub provider: CiProvider,
    pub owner: String,
    pub repo: String,
    /// Pull request / merge request number
    pub number: u64,
    pub token: String,
    /// Server host, for self-hosted instances
    pub server_host: String,
}

static PULL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs/pull/(\d+)/").expect("valid pull ref regex"));

/// Detect the CI environment from process environment variables
pub fn detect() -> Result<Environment> {
    detect_from(&|name| std::env::var(name).ok())
}

/// Detect the CI environment through an injectable variable lookup
pub fn detect_from(env: &dyn Fn(&str) -> Option<String>) -> Result<Environment> {
    if env("GITHUB_ACTIONS").as_deref() == Some("true") {
        return detect_github(env);
    }

    if env("GITLAB_CI").as_deref() == Some("true") {
        return detect_gitlab(env);
    }

    bail!("not running in a supported CI environment (GitHub Actions or GitLab CI)")
}

fn detect_github(env: &dyn Fn(&str) -> Option<String>) -> Result<Environment> {
    let repository = env("GITHUB_REPOSITORY").context("GITHUB_REPOSITORY not set")?;
    let (owner, repo) = repository
        .split_once('/')
        .with_context(|| format!("invalid GITHUB_REPOSITORY format: {}", repository))?;

    let number = github_pr_number(env)?;

    let token = env("GITHUB_TOKEN").context("GITHUB_TOKEN not set")?;

    Ok(Environment {
        provider: CiProvider::GitHub,
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
        token,
        server_host: "github.com".to_string(),
    })
}

/// Extract the PR number from `GITHUB_REF` or the Actions event payload
fn github_pr_number(env: &dyn Fn(&str) -> Option<String>) -> Result<u64> {
    if let Some(git_ref) = env("GITHUB_REF") {
        if let Some(caps) = PULL_REF.captures(&git_ref) {
            return caps[1].parse().context("invalid PR number in GITHUB_REF");
        }
    }

    if let Some(event_path) = env("GITHUB_EVENT_PATH") {
        if let Ok(data) = std::fs::read_to_string(&event_path) {
            if let Ok(event) = serde_json::from_str::<EventPayload>(&data) {
                if let Some(pr) = event.pull_request {
                    if pr.number > 0 {
                        return Ok(pr.number);
                    }
                }
                if let Some(number) = event.number {
                    if number > 0 {
                        return Ok(number);
                    }
                }
            }
        }
    }

    bail!("could not determine PR number: not running in a pull_request event")
}

#[derive(Debug, serde::Deserialize)]
struct EventPayload {
    pull_request: Option<EventPullRequest>,
    number: Option<u64>,
}

#[derive(Debug, serde::Deserialize)]
struct EventPullRequest {
    number: u64,
}

fn detect_gitlab(env: &dyn Fn(&str) -> Option<String>) -> Result<Environment> {
    let project_path = env("CI_PROJECT_PATH").context("CI_PROJECT_PATH not set")?;
    let (owner, repo) = project_path
        .split_once('/')
        .with_context(|| format!("invalid CI_PROJECT_PATH format: {}", project_path))?;

    let mr_iid = env("CI_MERGE_REQUEST_IID")
        .context("CI_MERGE_REQUEST_IID not set: not running in a merge_request pipeline")?;
    let number: u64 = mr_iid
        .parse()
        .with_context(|| format!("invalid CI_MERGE_REQUEST_IID: {}", mr_iid))?;

    let server_host = env("CI_SERVER_HOST").unwrap_or_else(|| "gitlab.com".to_string());

    // Prefer a personal token over the job token
    let token = env("GITLAB_TOKEN")
        .or_else(|| env("CI_JOB_TOKEN"))
        .context("GITLAB_TOKEN or CI_JOB_TOKEN not set")?;

    Ok(Environment {
        provider: CiProvider::GitLab,
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
        token,
        server_host,
    })
}
