//! Error types for commit-hooks.
//!
//! This module defines all errors that can occur during operation.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in commit-hooks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Manifest errors
    // =========================================================================
    /// Hook manifest not found.
    #[error("Hook manifest not found: {path}")]
    ManifestNotFound {
        /// Path where the manifest was expected.
        path: PathBuf,
    },

    /// Hook manifest is not well-formed YAML or has the wrong shape.
    #[error("Failed to parse hook manifest {path}: {message}")]
    ManifestParse {
        /// Manifest path.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Hook manifest parsed but failed validation.
    #[error("Hook manifest has {count} error(s)")]
    ManifestInvalid {
        /// Number of error-level diagnostics.
        count: usize,
    },

    // =========================================================================
    // Git errors
    // =========================================================================
    /// Not in a Git repository.
    #[error("Not in a Git repository")]
    NotGitRepo,

    /// Git operation failed.
    #[error("Git operation failed: {operation} - {message}")]
    GitOperation {
        /// Name of the operation that failed.
        operation: String,
        /// Error message.
        message: String,
    },

    // =========================================================================
    // Commit message errors
    // =========================================================================
    /// Branch names a commit type but carries no issue key.
    #[error("Branch name contains a type but no jira issue no.")]
    BranchMissingIssue {
        /// The offending branch name.
        branch: String,
    },

    /// Neither the branch nor the message yields a commit type.
    #[error(
        "Commit type could not be determined from the branch name '{branch}' or the commit \
         message '{message}'. Start the commit message with one of {{{skip_prefixes}}} to \
         skip this check."
    )]
    CommitTypeUndetermined {
        /// Branch name (empty when unknown).
        branch: String,
        /// Trimmed commit message.
        message: String,
        /// Skip prefixes, rendered as `a:, b:`.
        skip_prefixes: String,
    },

    /// The message starts with a type that is not a conventional commit type.
    #[error("Commit type '{commit_type}' is not allowed according to conventional commit.")]
    CommitTypeNotAllowed {
        /// Lowercased type found in the message.
        commit_type: String,
    },

    /// A commit type was found but no issue key is available.
    #[error("Either commit_type or issue_no could not be determined.")]
    IssueUndetermined,

    // =========================================================================
    // Command execution errors
    // =========================================================================
    /// Command not found.
    #[error("Command not found: {command}")]
    CommandNotFound {
        /// The command that wasn't found.
        command: String,
    },

    // =========================================================================
    // Hook errors
    // =========================================================================
    /// Hook already exists and wasn't created by us.
    #[error("Git hook already exists at {path}. Use --force to overwrite.")]
    HookExists {
        /// Path to existing hook.
        path: PathBuf,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error with source.
    pub fn config_parse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new manifest parse error with source.
    pub fn manifest_parse(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ManifestParse {
            path: path.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new Git operation error.
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error came from commit message formatting.
    pub const fn is_commit_msg_error(&self) -> bool {
        matches!(
            self,
            Self::BranchMissingIssue { .. }
                | Self::CommitTypeUndetermined { .. }
                | Self::CommitTypeNotAllowed { .. }
                | Self::IssueUndetermined
        )
    }

    /// Returns true if this is a user-correctable error.
    pub const fn is_user_error(&self) -> bool {
        self.is_commit_msg_error()
            || matches!(
                self,
                Self::ConfigNotFound { .. }
                    | Self::ConfigInvalid { .. }
                    | Self::ManifestNotFound { .. }
                    | Self::ManifestInvalid { .. }
                    | Self::NotGitRepo
                    | Self::HookExists { .. }
            )
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::ManifestNotFound { .. }
            | Self::ManifestParse { .. }
            | Self::ManifestInvalid { .. } => 78, // EX_CONFIG
            Self::NotGitRepo | Self::GitOperation { .. } => 65, // EX_DATAERR
            _ => 1,
        }
    }
}
