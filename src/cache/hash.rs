//! Function fingerprints and comment markers

use crate::extract::ExtractedFunction;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Marker prefix identifying ainspector fingerprints in comment bodies
pub const HASH_PREFIX: &str = "<!-- ainspector:fn:";
/// Marker suffix
pub const HASH_SUFFIX: &str = " -->";
/// Length of the short hash, like a git short SHA
///
/// 12 hex chars is 48 bits. Collisions are theoretically possible and
/// accepted: the width is frozen because lengthening it would orphan every
/// marker already posted.
pub const HASH_LENGTH: usize = 12;

/// Field separator for hash input; `:` occurs in paths and qualified names
const FIELD_SEP: char = '\u{1f}';

static HASH_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!-- ainspector:fn:([a-f0-9]{12}) -->").expect("valid marker regex")
});

/// Generate the fingerprint of an extracted function
///
/// Pure function of file path, name, content, and scoped diff: any change to
/// the function or to its modifications triggers a re-review.
pub fn function_hash(function: &ExtractedFunction) -> String {
    let data = format!(
        "{}{sep}{}{sep}{}{sep}{}",
        function.file_path,
        function.name,
        function.content,
        function.diff,
        sep = FIELD_SEP,
    );

    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LENGTH);
    digest
}

/// Wrap a fingerprint in the HTML comment marker
///
/// The marker renders invisibly in the markdown views of GitHub and GitLab.
pub fn format_hash_marker(hash: &str) -> String {
    format!("{}{}{}", HASH_PREFIX, hash, HASH_SUFFIX)
}

/// Extract the first fingerprint marker from a comment body
///
/// Absent, malformed, or wrong-length markers yield `None`.
pub fn extract_hash(comment_body: &str) -> Option<String> {
    HASH_MARKER
        .captures(comment_body)
        .map(|caps| caps[1].to_string())
}
