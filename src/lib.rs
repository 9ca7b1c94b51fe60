//! AInspector - AI-powered code review for pull and merge requests
//!
//! This library provides the core functionality for extracting modified
//! functions from a changeset, reviewing them with an LLM, and posting
//! idempotent inline comments on GitHub PRs and GitLab MRs.

pub mod cache;
pub mod ci;
pub mod cli;
pub mod config;
pub mod diff;
pub mod extract;
pub mod llm;
pub mod parser;
pub mod provider;

/// Re-export commonly used types
pub use cache::Tracker;
pub use extract::{ExtractedFunction, Extractor};
pub use parser::FunctionBoundary;
pub use provider::{ModifiedFile, Provider};

/// Application-wide error type
pub use anyhow::Result;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "ainspector";
