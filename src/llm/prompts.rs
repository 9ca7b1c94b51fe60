//! Prompt construction for the review LLM

use crate::extract::ExtractedFunction;

/// Returned by the LLM when there are no issues to report
pub const LGTM_MARKER: &str = "LGTM";

pub const BASE_SYSTEM_PROMPT: &str = r#"You are an expert code reviewer. You will receive a function along with the diff showing only the modified lines.

IMPORTANT: Focus your review ONLY on the changes shown in the diff. The full function is provided for context only - do not review unchanged code.

For the modified lines, identify ONLY actual issues:
- Bugs or logic errors
- Security vulnerabilities
- Serious performance problems
- Violations of language best practices
- Code that could cause runtime errors

RESPONSE FORMAT:
If there are NO issues, respond with exactly: LGTM

If there ARE issues, respond with a JSON object in this exact format:
{
  "issues": [
    {
      "line": <line number in the file where the issue is>,
      "description": "<brief description of the issue>",
      "suggestion": "<corrected code to replace the problematic line(s), or empty string if no fix suggested>"
    }
  ]
}

IMPORTANT RULES:
- The "line" field must be an actual line number from the file (between the function's start and end lines)
- The "suggestion" field should contain the corrected code that can replace the problematic code
- Do NOT comment on code style, formatting, or minor improvements
- Do NOT give positive feedback or praise
- Only report problems that should be fixed
- Respond in the same language as the code comments, or in English if there are no comments"#;

/// Per-language review rule addenda
fn language_rules(language: &str) -> Option<&'static str> {
    match language {
        "rust" => Some(
            r#"
LANGUAGE-SPECIFIC CHECKS FOR RUST:
- Verify proper error handling with Result type
- Check for potential panics (unwrap, expect usage)
- Ensure proper lifetime annotations where needed
- Verify ownership and borrowing rules are followed
- Check for potential race conditions even with Rust's safety
- Ensure proper use of Option type (avoid unwrap on None)
- Verify unsafe blocks are necessary and sound"#,
        ),
        "python" => Some(
            r#"
LANGUAGE-SPECIFIC CHECKS FOR PYTHON:
- Verify proper exception handling (catch specific exceptions, not bare except)
- Check for resource leaks (use context managers/with statements)
- Ensure mutable default arguments are not used
- Check for proper iterator usage (avoid modifying during iteration)
- Verify None checks before attribute access
- Check for SQL injection vulnerabilities (use parameterized queries)
- Ensure proper use of async/await in async functions"#,
        ),
        "go" => Some(
            r#"
LANGUAGE-SPECIFIC CHECKS FOR GO:
- Verify all errors are properly handled (no ignored errors)
- Check for potential nil pointer dereferences
- Ensure goroutines won't leak (proper cleanup/cancellation)
- Verify context is properly propagated in function signatures
- Check for race conditions in concurrent code
- Ensure defer statements are used correctly (not in loops unless intended)
- Verify proper use of channels (close on sender side, check for closed channels)"#,
        ),
        "javascript" => Some(
            r#"
LANGUAGE-SPECIFIC CHECKS FOR JAVASCRIPT:
- Verify async functions properly await promises
- Check for unhandled promise rejections
- Ensure variables are properly scoped (avoid var, prefer const/let)
- Check for potential null/undefined access
- Verify proper error handling in async/await blocks
- Check for memory leaks (event listeners, timers not cleaned up)
- Ensure proper use of === instead of =="#,
        ),
        "typescript" => Some(
            r#"
LANGUAGE-SPECIFIC CHECKS FOR TYPESCRIPT:
- Verify async functions properly await promises
- Check for unhandled promise rejections
- Ensure proper TypeScript types (avoid 'any' type unless necessary)
- Check for potential null/undefined access (use optional chaining)
- Verify proper error handling in async/await blocks
- Check for memory leaks (event listeners, timers not cleaned up)
- Ensure type assertions are safe and necessary"#,
        ),
        _ => None,
    }
}

/// Build the system prompt for a given language, with optional project
/// context and extra configured rules
pub fn build_system_prompt(
    language: &str,
    project_context: Option<&str>,
    extra_rules: &[String],
) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();

    if let Some(context) = project_context {
        if !context.is_empty() {
            prompt.push_str("\n\n=== PROJECT CONTEXT ===\n");
            prompt.push_str(context);
        }
    }

    if let Some(rules) = language_rules(language) {
        prompt.push('\n');
        prompt.push_str(rules);
    }

    if !extra_rules.is_empty() {
        prompt.push_str("\n\nADDITIONAL PROJECT RULES:\n");
        for rule in extra_rules {
            prompt.push_str("- ");
            prompt.push_str(rule);
            prompt.push('\n');
        }
    }

    prompt
}

/// Build the per-function user prompt
pub fn build_user_prompt(function: &ExtractedFunction) -> String {
    let diff_section = if function.diff.is_empty() {
        String::new()
    } else {
        format!(
            "\n\n## Changes (REVIEW THESE):\n```diff\n{}\n```",
            function.diff
        )
    };

    format!(
        "Review the changes in this {} function:\n\nFile: {}\nFunction: {} (lines {}-{})\nChange type: {}{}\n\n## Full function (for context only, DO NOT review unchanged code):\n```{}\n{}\n```",
        function.language,
        function.file_path,
        function.name,
        function.start_line,
        function.end_line,
        function.change_type,
        diff_section,
        function.language,
        function.content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ChangeType;

    fn sample_function() -> ExtractedFunction {
        ExtractedFunction {
            name: "compute".to_string(),
            start_line: 3,
            end_line: 8,
            content: "fn compute() {}".to_string(),
            diff: "+fn compute() {}".to_string(),
            file_path: "src/math.rs".to_string(),
            language: "rust".to_string(),
            change_type: ChangeType::Added,
        }
    }

    #[test]
    fn test_system_prompt_includes_language_rules() {
        let prompt = build_system_prompt("rust", None, &[]);
        assert!(prompt.contains("CHECKS FOR RUST"));

        let prompt = build_system_prompt("cobol", None, &[]);
        assert!(!prompt.contains("LANGUAGE-SPECIFIC"));
    }

    #[test]
    fn test_system_prompt_includes_context_and_rules() {
        let rules = vec!["never log secrets".to_string()];
        let prompt = build_system_prompt("go", Some("A CLI tool."), &rules);

        assert!(prompt.contains("=== PROJECT CONTEXT ===\nA CLI tool."));
        assert!(prompt.contains("- never log secrets"));
    }

    #[test]
    fn test_user_prompt_layout() {
        let prompt = build_user_prompt(&sample_function());

        assert!(prompt.contains("File: src/math.rs"));
        assert!(prompt.contains("Function: compute (lines 3-8)"));
        assert!(prompt.contains("Change type: added"));
        assert!(prompt.contains("```diff\n+fn compute() {}\n```"));
    }

    #[test]
    fn test_user_prompt_without_diff() {
        let mut function = sample_function();
        function.diff.clear();

        let prompt = build_user_prompt(&function);
        assert!(!prompt.contains("## Changes"));
    }
}
