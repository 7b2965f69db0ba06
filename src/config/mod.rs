//! Configuration handling for commit-hooks.
//!
//! This module provides configuration loading and validation,
//! supporting both `commit-hooks.toml` files and sensible defaults.

use crate::core::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "commit-hooks.toml";

/// Conventional commit types accepted by default.
pub const DEFAULT_COMMIT_TYPES: &[&str] = &[
    "fix", "feat", "build", "chore", "ci", "docs", "style", "refactor", "perf", "test",
];

/// Message prefixes that bypass formatting.
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &["skip", "no-verify", "s"];

/// Issue keys such as `PROJ-123`.
pub const DEFAULT_ISSUE_PATTERN: &str = "^[A-Za-z]+-[0-9]+$";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Commit message hook settings.
    pub commit_msg: CommitMsgConfig,
    /// Hook manifest settings.
    pub manifest: ManifestConfig,
}

impl Config {
    /// Loads configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::find_config_file()?;
        Self::load_from(&path)
    }

    /// Loads configuration or returns defaults if not found.
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => {
                tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
                Ok(Self::default())
            },
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");

        Ok(config)
    }

    /// Finds the configuration file by searching up the directory tree.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;

        let mut current = cwd.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::ConfigNotFound {
            path: cwd.join(CONFIG_FILE_NAME),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.commit_msg.validate()?;

        if humantime::parse_duration(&self.manifest.resolve_timeout).is_err() {
            return Err(Error::ConfigInvalid {
                field: "manifest.resolve_timeout".to_string(),
                message: format!("Invalid duration: {}", self.manifest.resolve_timeout),
            });
        }

        if self.manifest.path.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "manifest.path".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Generates default configuration as a string.
    #[must_use]
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Settings for the commit message formatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMsgConfig {
    /// Allowed commit types (also the branch prefixes that carry a type).
    pub types: Vec<String>,
    /// Message prefixes that bypass formatting.
    pub skip_prefixes: Vec<String>,
    /// Regex a branch's issue segment must match.
    pub issue_pattern: String,
}

impl Default for CommitMsgConfig {
    fn default() -> Self {
        Self {
            types: DEFAULT_COMMIT_TYPES.iter().map(|s| (*s).to_string()).collect(),
            skip_prefixes: DEFAULT_SKIP_PREFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            issue_pattern: DEFAULT_ISSUE_PATTERN.to_string(),
        }
    }
}

impl CommitMsgConfig {
    /// Validates the commit message settings.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "commit_msg.types".to_string(),
                message: "at least one commit type is required".to_string(),
            });
        }

        if let Some(t) = self.types.iter().find(|t| !is_word(t)) {
            return Err(Error::ConfigInvalid {
                field: "commit_msg.types".to_string(),
                message: format!("'{t}' must consist of ASCII letters only"),
            });
        }

        if let Some(overlap) = self
            .skip_prefixes
            .iter()
            .find(|p| self.is_commit_type(p))
        {
            return Err(Error::ConfigInvalid {
                field: "commit_msg.skip_prefixes".to_string(),
                message: format!("'{overlap}' is also a commit type"),
            });
        }

        self.issue_regex()?;

        Ok(())
    }

    /// Compiles the issue pattern.
    pub fn issue_regex(&self) -> Result<Regex> {
        Regex::new(&self.issue_pattern).map_err(|e| Error::ConfigInvalid {
            field: "commit_msg.issue_pattern".to_string(),
            message: e.to_string(),
        })
    }

    /// Returns true if `word` is a configured commit type (case-insensitive).
    #[must_use]
    pub fn is_commit_type(&self, word: &str) -> bool {
        self.types.iter().any(|t| t.eq_ignore_ascii_case(word))
    }

    /// Returns true if `word` is a configured skip prefix (case-insensitive).
    #[must_use]
    pub fn is_skip_prefix(&self, word: &str) -> bool {
        self.skip_prefixes.iter().any(|p| p.eq_ignore_ascii_case(word))
    }
}

/// Settings for hook manifest commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest path, relative to the repository root.
    pub path: String,
    /// Timeout for each git command while resolving hook sources.
    pub resolve_timeout: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: crate::manifest::MANIFEST_FILE_NAME.to_string(),
            resolve_timeout: "2m".to_string(),
        }
    }
}

impl ManifestConfig {
    /// Parsed resolve timeout; falls back to two minutes.
    #[must_use]
    pub fn resolve_timeout(&self) -> Duration {
        humantime::parse_duration(&self.resolve_timeout).unwrap_or_else(|_| {
            tracing::warn!(
                timeout = %self.resolve_timeout,
                "Invalid timeout format, using default"
            );
            Duration::from_secs(120)
        })
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.commit_msg.types.len(), 10);
        assert!(config.commit_msg.is_commit_type("FEAT"));
        assert!(config.commit_msg.is_skip_prefix("no-verify"));
        assert_eq!(config.manifest.path, ".pre-commit-config.yaml");
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = Config::default();
        config.manifest.resolve_timeout = "invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { field, .. }) if field == "manifest.resolve_timeout"
        ));
    }

    #[test]
    fn test_invalid_issue_pattern() {
        let mut config = Config::default();
        config.commit_msg.issue_pattern = "([A-Z".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { field, .. }) if field == "commit_msg.issue_pattern"
        ));
    }

    #[test]
    fn test_empty_types_rejected() {
        let mut config = Config::default();
        config.commit_msg.types.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_word_type_rejected() {
        let mut config = Config::default();
        config.commit_msg.types.push("hot-fix".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_skip_prefix_overlapping_type_rejected() {
        let mut config = Config::default();
        config.commit_msg.skip_prefixes.push("Fix".to_string());
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { field, .. }) if field == "commit_msg.skip_prefixes"
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[commit_msg]
types = ["feat", "fix"]
"#,
        )
        .expect("parse");
        assert_eq!(config.commit_msg.types, vec!["feat", "fix"]);
        assert_eq!(config.commit_msg.issue_pattern, DEFAULT_ISSUE_PATTERN);
        assert_eq!(config.manifest.resolve_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml = Config::default_toml();
        assert!(toml.contains("[commit_msg]"));
        assert!(toml.contains("[manifest]"));
        let parsed: Config = toml::from_str(&toml).expect("reparse");
        assert!(parsed.validate().is_ok());
    }
}
