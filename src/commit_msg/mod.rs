//! Commit message formatting from branch names.
//!
//! Branches named `<type>/<ISSUE>/...` carry a default commit type and an
//! issue key. A message is rewritten to `<ISSUE>(<type>): <message>`, where
//! the type comes from an explicit `type:` prefix in the message or, failing
//! that, from the branch.
//!
//! ```
//! use commit_hooks::commit_msg::CommitMessage;
//! use commit_hooks::config::CommitMsgConfig;
//!
//! let config = CommitMsgConfig::default();
//! let formatter = CommitMessage::new(&config, Some("feat/ABC-456")).unwrap();
//! let formatted = formatter.format("fix: my message here").unwrap();
//! assert_eq!(formatted.message, "ABC-456(fix): my message here");
//! ```

use crate::config::CommitMsgConfig;
use crate::core::error::{Error, Result};
use regex::Regex;
use std::path::Path;

/// Explicit type or skip prefix at the start of a message, e.g. `fix:` or
/// `no-verify:`.
const TYPE_PREFIX_PATTERN: &str = r"^([A-Za-z][A-Za-z-]*):";

/// Commit type and issue key carried by a branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Lowercased commit type (first path segment).
    pub commit_type: String,
    /// Issue key (second path segment).
    pub issue: String,
}

impl BranchInfo {
    /// Parses `branch`.
    ///
    /// Returns `None` when the first segment is not a commit type. A branch
    /// whose first segment is a type must carry an issue key as its second
    /// segment.
    pub fn parse(branch: &str, config: &CommitMsgConfig) -> Result<Option<Self>> {
        let mut segments = branch.split('/');
        let first = segments.next().unwrap_or_default();

        if !config.is_commit_type(first) {
            tracing::debug!(branch, "branch name carries no commit type");
            return Ok(None);
        }

        let issue_re = config.issue_regex()?;
        let issue = segments
            .next()
            .and_then(|segment| issue_re.find(segment))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::BranchMissingIssue {
                branch: branch.to_string(),
            })?;

        Ok(Some(Self {
            commit_type: first.to_ascii_lowercase(),
            issue,
        }))
    }
}

/// Result of formatting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    /// The message to commit.
    pub message: String,
    /// Commit type used, lowercased. `None` when skipped or left unchanged.
    pub commit_type: Option<String>,
    /// Issue key used, uppercased.
    pub issue: Option<String>,
    /// A skip prefix was stripped and nothing else done.
    pub skipped: bool,
    /// The message was left as it was.
    pub unchanged: bool,
}

impl Formatted {
    fn unchanged(message: &str) -> Self {
        Self {
            message: message.to_string(),
            commit_type: None,
            issue: None,
            skipped: false,
            unchanged: true,
        }
    }
}

/// Formats commit messages for one branch.
#[derive(Debug, Clone)]
pub struct CommitMessage<'a> {
    config: &'a CommitMsgConfig,
    branch: String,
    info: Option<BranchInfo>,
    type_prefix: Regex,
    formatted: Regex,
}

impl<'a> CommitMessage<'a> {
    /// Creates a formatter for `branch` (`None` for a detached HEAD).
    pub fn new(config: &'a CommitMsgConfig, branch: Option<&str>) -> Result<Self> {
        let info = match branch {
            Some(branch) => BranchInfo::parse(branch, config)?,
            None => None,
        };

        Ok(Self {
            config,
            branch: branch.unwrap_or_default().to_string(),
            info,
            type_prefix: compile(TYPE_PREFIX_PATTERN)?,
            formatted: formatted_regex(config)?,
        })
    }

    /// What the branch name provided, if anything.
    #[must_use]
    pub fn branch_info(&self) -> Option<&BranchInfo> {
        self.info.as_ref()
    }

    /// Formats `message`.
    pub fn format(&self, message: &str) -> Result<Formatted> {
        // git aborts on an empty message; keep it empty
        if is_blank(message) {
            return Ok(Formatted::unchanged(message));
        }

        if let Some(caps) = self.formatted.captures(message) {
            if self.config.is_commit_type(&caps["type"]) {
                tracing::debug!("message is already formatted");
                return Ok(Formatted::unchanged(message));
            }
        }

        let (commit_type, body) = match self.type_prefix.captures(message) {
            Some(caps) => {
                let word = &caps[1];
                if !self.config.is_skip_prefix(word) && !self.config.is_commit_type(word) {
                    return Err(Error::CommitTypeNotAllowed {
                        commit_type: word.to_ascii_lowercase(),
                    });
                }
                (word.to_string(), message[caps[0].len()..].trim().to_string())
            },
            None => match &self.info {
                Some(info) => (info.commit_type.clone(), message.to_string()),
                None => {
                    return Err(Error::CommitTypeUndetermined {
                        branch: self.branch.clone(),
                        message: message.trim().to_string(),
                        skip_prefixes: self.skip_prefix_list(),
                    })
                },
            },
        };

        if self.config.is_skip_prefix(&commit_type) {
            tracing::debug!(prefix = %commit_type, "skip prefix found, message left unformatted");
            return Ok(Formatted {
                message: body,
                commit_type: None,
                issue: None,
                skipped: true,
                unchanged: false,
            });
        }

        let issue = self
            .info
            .as_ref()
            .map(|info| info.issue.to_ascii_uppercase())
            .ok_or(Error::IssueUndetermined)?;
        let commit_type = commit_type.to_ascii_lowercase();

        tracing::info!(%commit_type, %issue, "extracted commit type and issue");

        Ok(Formatted {
            message: format!("{issue}({commit_type}): {body}"),
            commit_type: Some(commit_type),
            issue: Some(issue),
            skipped: false,
            unchanged: false,
        })
    }

    /// Formats the message file at `path` in place.
    pub fn format_file(&self, path: &Path) -> Result<Formatted> {
        let message =
            std::fs::read_to_string(path).map_err(|e| Error::io("read commit message", e))?;

        let formatted = self.format(&message)?;
        if !formatted.unchanged {
            std::fs::write(path, &formatted.message)
                .map_err(|e| Error::io("write commit message", e))?;
        }

        Ok(formatted)
    }

    fn skip_prefix_list(&self) -> String {
        self.config
            .skip_prefixes
            .iter()
            .map(|p| format!("{p}:"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// True when the message has no content besides blank and comment lines.
fn is_blank(message: &str) -> bool {
    message
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

/// Matches a message this formatter already produced, e.g. `ABC-1(feat): `,
/// using the configured issue pattern for the key.
fn formatted_regex(config: &CommitMsgConfig) -> Result<Regex> {
    let issue = config.issue_regex()?;
    let pattern = format!(
        r"^(?:{})\((?P<type>[A-Za-z]+)\): ",
        strip_anchors(issue.as_str())
    );
    Regex::new(&pattern).map_err(|e| Error::ConfigInvalid {
        field: "commit_msg.issue_pattern".to_string(),
        message: e.to_string(),
    })
}

/// Drops a leading `^` and an unescaped trailing `$`.
fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Internal {
        message: format!("invalid built-in pattern {pattern}: {e}"),
    })
}
