//! Tracking of already-reviewed functions
//!
//! The tracker is rehydrated once per run from the markers found in
//! existing PR/MR comments, then queried; it never persists anything.

use super::hash::{extract_hash, function_hash};
use crate::extract::ExtractedFunction;
use crate::provider::ExistingComment;
use std::collections::HashSet;

/// Tracks which functions have already been reviewed in a PR/MR
#[derive(Debug, Default)]
pub struct Tracker {
    reviewed: HashSet<String>,
}

impl Tracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the tracker from existing PR/MR comments
    ///
    /// Comments without a recognizable marker contribute nothing and are
    /// not errors.
    pub fn load_from_comments(&mut self, comments: &[ExistingComment]) {
        for comment in comments {
            if let Some(hash) = extract_hash(&comment.body) {
                self.reviewed.insert(hash);
            }
        }
    }

    /// Check if a function has already been reviewed
    pub fn is_reviewed(&self, function: &ExtractedFunction) -> bool {
        self.reviewed.contains(&function_hash(function))
    }

    /// Return only the functions that have not been reviewed yet,
    /// preserving input order
    pub fn filter_unreviewed(&self, functions: Vec<ExtractedFunction>) -> Vec<ExtractedFunction> {
        functions
            .into_iter()
            .filter(|function| !self.is_reviewed(function))
            .collect()
    }

    /// Number of distinct fingerprints loaded; diagnostics only
    pub fn reviewed_count(&self) -> usize {
        self.reviewed.len()
    }
}
