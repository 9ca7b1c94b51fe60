//! Repository configuration for AInspector
//!
//! Loaded from `ainspector.toml` in the working directory; a missing file
//! yields the defaults, not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The ainspector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Patterns for files to skip during review
    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Patterns for files to include in the project context sent to the LLM
    #[serde(default)]
    pub context: ContextConfig,

    /// Extra free-text review rules appended to the system prompt
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Glob patterns for files to ignore during review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Glob patterns; `**` matches recursively, bare patterns also match
    /// basenames
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Glob patterns selecting project context files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub include: Vec<String>,
    /// Takes priority over `include`
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Supported configuration file names, in priority order
const CONFIG_FILE_NAMES: [&str; 2] = ["ainspector.toml", ".ainspector.toml"];

impl Config {
    /// Load the configuration from the working directory, or defaults when
    /// no config file exists
    pub fn load() -> Result<Self> {
        for name in CONFIG_FILE_NAMES {
            if Path::new(name).exists() {
                return Self::load_from_path(Path::new(name));
            }
        }
        Ok(Self::default())
    }

    /// Load the configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Check if a file path should be ignored during review
    pub fn should_ignore(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");

        self.ignore.paths.iter().any(|pattern| {
            let pattern = pattern.replace('\\', "/");

            // Directory patterns ending with / cover everything inside
            if let Some(dir) = pattern.strip_suffix('/') {
                return normalized == dir || normalized.starts_with(&format!("{}/", dir));
            }

            if glob_match(&pattern, &normalized) {
                return true;
            }

            // Bare patterns also match the basename
            let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
            glob_match(&pattern, basename)
        })
    }
}

impl ContextConfig {
    /// Check if a path is selected for project context
    pub fn matches(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");

        if self.exclude.iter().any(|p| glob_match(p, &normalized)) {
            return false;
        }

        self.include.iter().any(|p| glob_match(p, &normalized))
    }
}

/// Simple glob matching with `*` and recursive `**` support
fn glob_match(pattern: &str, path: &str) -> bool {
    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.splitn(2, "**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');
            let prefix_ok = prefix.is_empty() || path.starts_with(prefix);
            let suffix_ok = suffix.is_empty() || suffix_match(suffix, path);
            return prefix_ok && suffix_ok;
        }
    }

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.splitn(2, '*').collect();
        if parts.len() == 2 && !parts[1].contains('*') {
            return path.starts_with(parts[0]) && path.ends_with(parts[1]);
        }
    }

    path == pattern
}

/// Match the suffix part of a `**` pattern, which may itself carry a `*`
fn suffix_match(suffix: &str, path: &str) -> bool {
    if let Some(ext) = suffix.strip_prefix('*') {
        return path.ends_with(ext);
    }
    path.ends_with(suffix)
}
