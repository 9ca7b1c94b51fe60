//! Unified diff analysis
//!
//! Parses the per-file patches returned by the hosting APIs into line-level
//! change facts, and answers two questions: does a line range contain any
//! added line, and what subset of the patch belongs to a given range.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors produced while parsing a unified diff patch
#[derive(Debug, Error)]
pub enum DiffError {
    /// The patch is non-empty but contains no parseable hunk
    #[error("patch contains no parseable hunks")]
    NoHunks,
}

/// Line numbers modified by a patch
///
/// `added` holds 1-based line numbers in the new file, `deleted` holds
/// 1-based line numbers in the old file, both in the order the hunks
/// declared them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedLines {
    pub added: Vec<usize>,
    pub deleted: Vec<usize>,
}

impl ModifiedLines {
    /// Check if any added line falls within the inclusive range
    ///
    /// Deleted lines deliberately do not count: a function is only touched
    /// when the resulting code contains a changed line inside its current
    /// boundaries. Fully deleted files are filtered out upstream.
    pub fn has_modified_line_in_range(&self, start_line: usize, end_line: usize) -> bool {
        self.added
            .iter()
            .any(|&line| line >= start_line && line <= end_line)
    }
}

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

/// One hunk of a unified diff
struct Hunk {
    new_start: usize,
    new_lines: usize,
    old_start: usize,
    body: Vec<String>,
}

/// The hosting APIs return patches without `---`/`+++` file headers;
/// synthesize placeholders so every patch has a well-formed envelope.
fn normalize_patch(patch: &str) -> Cow<'_, str> {
    if patch.starts_with("---") {
        Cow::Borrowed(patch)
    } else {
        Cow::Owned(format!("--- a/file\n+++ b/file\n{}", patch))
    }
}

/// Split a patch into hunks, tolerating leading file headers
fn parse_hunks(patch: &str) -> Result<Vec<Hunk>, DiffError> {
    let patch = normalize_patch(patch);
    let mut hunks: Vec<Hunk> = Vec::new();

    for line in patch.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            let old_start = caps[1].parse().unwrap_or(1);
            let new_start = caps[3].parse().unwrap_or(1);
            let new_lines = caps
                .get(4)
                .map(|m| m.as_str().parse().unwrap_or(1))
                .unwrap_or(1);
            hunks.push(Hunk {
                new_start,
                new_lines,
                old_start,
                body: Vec::new(),
            });
        } else if let Some(hunk) = hunks.last_mut() {
            hunk.body.push(line.to_string());
        }
        // Lines before the first hunk header are file headers; skip them.
    }

    if hunks.is_empty() {
        return Err(DiffError::NoHunks);
    }

    Ok(hunks)
}

/// Parse a unified diff patch into modified line numbers
///
/// An empty patch yields an empty result. Each hunk is walked with two
/// independent counters seeded from its declared start positions: `+` lines
/// record and advance the new-file counter, `-` lines record and advance the
/// old-file counter, everything else is context and advances both.
pub fn parse_patch(patch: &str) -> Result<ModifiedLines, DiffError> {
    if patch.is_empty() {
        return Ok(ModifiedLines::default());
    }

    let hunks = parse_hunks(patch)?;
    let mut result = ModifiedLines::default();

    for hunk in &hunks {
        let mut new_line = hunk.new_start;
        let mut old_line = hunk.old_start;

        for line in &hunk.body {
            match line.as_bytes().first() {
                Some(b'+') => {
                    result.added.push(new_line);
                    new_line += 1;
                }
                Some(b'-') => {
                    result.deleted.push(old_line);
                    old_line += 1;
                }
                // "\ No newline at end of file" belongs to neither side
                Some(b'\\') => {}
                // Context, including lines with no prefix at all
                _ => {
                    new_line += 1;
                    old_line += 1;
                }
            }
        }
    }

    Ok(result)
}

/// Extract the portion of a patch that affects the given line range
///
/// Emits raw diff lines with their prefixes intact. An added line is kept
/// when its new-file line number falls in `[start_line, end_line]`; a deleted
/// line when its adjacent new-file position falls in `[start_line,
/// end_line + 1]`, so a deletion immediately preceding a function's first
/// changed line is still attributed to that function. Context lines only
/// advance the counter. Malformed or non-overlapping patches yield "".
pub fn extract_diff_for_range(patch: &str, start_line: usize, end_line: usize) -> String {
    if patch.is_empty() {
        return String::new();
    }

    let hunks = match parse_hunks(patch) {
        Ok(hunks) => hunks,
        Err(_) => return String::new(),
    };

    let mut result = Vec::new();

    for hunk in &hunks {
        // Hunk-level fast skip. A pure-deletion hunk has an empty new-file
        // span; its deletions all sit adjacent to `new_start`, so the skip
        // uses the same `[start, end + 1]` window as the per-line rule.
        if hunk.new_lines == 0 {
            if hunk.new_start < start_line || hunk.new_start > end_line.saturating_add(1) {
                continue;
            }
        } else {
            let hunk_end = hunk.new_start + hunk.new_lines - 1;
            if hunk_end < start_line || hunk.new_start > end_line {
                continue;
            }
        }

        let mut new_line = hunk.new_start;
        for line in &hunk.body {
            match line.as_bytes().first() {
                Some(b'+') => {
                    if new_line >= start_line && new_line <= end_line {
                        result.push(line.as_str());
                    }
                    new_line += 1;
                }
                Some(b'-') => {
                    if new_line >= start_line && new_line <= end_line.saturating_add(1) {
                        result.push(line.as_str());
                    }
                }
                Some(b'\\') => {}
                _ => {
                    new_line += 1;
                }
            }
        }
    }

    result.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_patch() {
        let result = parse_patch("").unwrap();
        assert!(result.added.is_empty());
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_parse_added_lines() {
        let patch = "@@ -1,3 +1,5 @@\n line1\n+added1\n+added2\n line2\n line3";
        let result = parse_patch(patch).unwrap();
        assert_eq!(result.added, vec![2, 3]);
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_parse_deleted_lines() {
        let patch = "@@ -1,5 +1,3 @@\n line1\n-deleted1\n-deleted2\n line2\n line3";
        let result = parse_patch(patch).unwrap();
        assert!(result.added.is_empty());
        assert_eq!(result.deleted, vec![2, 3]);
    }

    #[test]
    fn test_parse_mixed_changes() {
        let patch = "@@ -1,4 +1,4 @@\n line1\n-old_line\n+new_line\n line3\n line4";
        let result = parse_patch(patch).unwrap();
        assert_eq!(result.added, vec![2]);
        assert_eq!(result.deleted, vec![2]);
    }

    #[test]
    fn test_parse_multiple_hunks() {
        let patch = "@@ -1,3 +1,4 @@\n line1\n+added_at_2\n line2\n line3\n\
                     @@ -10,3 +11,4 @@\n line10\n+added_at_12\n line11\n line12";
        let result = parse_patch(patch).unwrap();
        assert_eq!(result.added, vec![2, 12]);
    }

    #[test]
    fn test_parse_with_file_headers() {
        let patch = "--- a/file.rs\n+++ b/file.rs\n@@ -1,3 +1,4 @@\n line1\n+added\n line2\n line3";
        let result = parse_patch(patch).unwrap();
        assert_eq!(result.added, vec![2]);
    }

    #[test]
    fn test_parse_counts_match_prefix_tally() {
        let patch = "@@ -1,6 +1,7 @@\n ctx\n+a\n-d\n ctx\n+b\n-e\n ctx\n+c";
        let result = parse_patch(patch).unwrap();
        let plus = patch.lines().filter(|l| l.starts_with('+')).count();
        let minus = patch.lines().filter(|l| l.starts_with('-')).count();
        assert_eq!(result.added.len(), plus);
        assert_eq!(result.deleted.len(), minus);
    }

    #[test]
    fn test_parse_invalid_patch() {
        // Must never panic; a typed error is acceptable for garbage input
        assert!(parse_patch("not a valid patch at all").is_err());
    }

    #[test]
    fn test_has_modified_line_in_range() {
        let cases = [
            (vec![5, 10, 15], 8, 12, true),
            (vec![5], 5, 10, true),  // inclusive at start
            (vec![10], 5, 10, true), // inclusive at end
            (vec![3], 5, 10, false),
            (vec![15], 5, 10, false),
            (vec![], 5, 10, false),
        ];

        for (added, start, end, expected) in cases {
            let lines = ModifiedLines {
                added,
                deleted: Vec::new(),
            };
            assert_eq!(
                lines.has_modified_line_in_range(start, end),
                expected,
                "range [{}, {}]",
                start,
                end
            );
        }
    }

    #[test]
    fn test_deletions_alone_never_match() {
        let patch = "@@ -1,3 +1,2 @@\n line1\n-deleted\n line2";
        let result = parse_patch(patch).unwrap();
        assert!(!result.has_modified_line_in_range(1, 100));
    }

    #[test]
    fn test_extract_empty_patch() {
        assert_eq!(extract_diff_for_range("", 1, 10), "");
    }

    #[test]
    fn test_extract_no_overlap() {
        let patch = "@@ -1,3 +1,4 @@\n line1\n+added\n line2\n line3";
        assert_eq!(extract_diff_for_range(patch, 100, 200), "");
    }

    #[test]
    fn test_extract_full_overlap() {
        let patch = "@@ -1,3 +1,4 @@\n line1\n+added_line\n line2\n line3";
        assert_eq!(extract_diff_for_range(patch, 1, 10), "+added_line");
    }

    #[test]
    fn test_extract_partial_overlap() {
        let patch = "@@ -1,5 +1,6 @@\n line1\n+added_at_2\n line2\n+added_at_4\n line3\n line4";
        assert_eq!(extract_diff_for_range(patch, 3, 6), "+added_at_4");
    }

    #[test]
    fn test_extract_with_deletions() {
        let patch = "@@ -1,4 +1,4 @@\n line1\n-old_line\n+new_line\n line3\n line4";
        // The replaced pair at line 2 is kept together
        assert_eq!(extract_diff_for_range(patch, 2, 2), "-old_line\n+new_line");
    }

    #[test]
    fn test_extract_deletion_adjacent_to_range_end() {
        // A deletion sitting one line past the range end is still attributed
        let patch = "@@ -1,4 +1,3 @@\n line1\n line2\n-trailing\n line3";
        assert_eq!(extract_diff_for_range(patch, 1, 2), "-trailing");
    }

    #[test]
    fn test_extract_second_hunk_only() {
        let patch = "@@ -1,3 +1,4 @@\n line1\n+added_first\n line2\n line3\n\
                     @@ -10,3 +11,4 @@\n line10\n+added_second\n line11\n line12";
        assert_eq!(extract_diff_for_range(patch, 11, 15), "+added_second");
    }

    #[test]
    fn test_extract_full_range_returns_everything() {
        let patch = "@@ -1,4 +1,4 @@\n line1\n-old\n+new\n line3\n line4\n\
                     @@ -10,3 +10,4 @@\n line10\n+tail\n line11\n line12";
        let result = extract_diff_for_range(patch, 1, usize::MAX);
        assert_eq!(result, "-old\n+new\n+tail");
    }

    #[test]
    fn test_extract_open_upper_bound_does_not_overflow() {
        let patch = "@@ -1,2 +1,1 @@\n line1\n-old";
        assert_eq!(extract_diff_for_range(patch, 1, usize::MAX), "-old");
    }

    #[test]
    fn test_extract_pure_deletion_hunk_adjacent_to_range() {
        // A hunk that only deletes (zero new-file lines) right after the
        // range end; the adjacency rule still attributes it
        let patch = "@@ -4 +3,0 @@\n-gone";
        assert_eq!(extract_diff_for_range(patch, 1, 2), "-gone");
    }

    #[test]
    fn test_extract_pure_deletion_hunk_outside_range() {
        let patch = "@@ -10,2 +9,0 @@\n-gone1\n-gone2";
        assert_eq!(extract_diff_for_range(patch, 1, 5), "");
    }

    #[test]
    fn test_extract_malformed_patch() {
        assert_eq!(extract_diff_for_range("garbage input", 1, 10), "");
    }

    #[test]
    fn test_no_newline_marker_does_not_shift_counters() {
        let patch = "@@ -1,2 +1,2 @@\n line1\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file";
        let result = parse_patch(patch).unwrap();
        assert_eq!(result.added, vec![2]);
        assert_eq!(result.deleted, vec![2]);
    }
}
