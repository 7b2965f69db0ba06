//! Lifecycle stages known to the pre-commit runner.

use std::fmt;
use std::str::FromStr;

/// A Git lifecycle point at which hooks can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// `commit-msg`: validate or rewrite the commit message.
    CommitMsg,
    /// `post-checkout`.
    PostCheckout,
    /// `post-commit`.
    PostCommit,
    /// `post-merge`.
    PostMerge,
    /// `post-rewrite`.
    PostRewrite,
    /// `pre-commit`: before the commit is finalized.
    PreCommit,
    /// `pre-merge-commit`.
    PreMergeCommit,
    /// `pre-push`.
    PrePush,
    /// `pre-rebase`.
    PreRebase,
    /// `prepare-commit-msg`.
    PrepareCommitMsg,
    /// `manual`: only run when requested explicitly.
    Manual,
}

impl Stage {
    /// Every stage, in the runner's documentation order.
    pub const ALL: [Self; 11] = [
        Self::CommitMsg,
        Self::PostCheckout,
        Self::PostCommit,
        Self::PostMerge,
        Self::PostRewrite,
        Self::PreCommit,
        Self::PreMergeCommit,
        Self::PrePush,
        Self::PreRebase,
        Self::PrepareCommitMsg,
        Self::Manual,
    ];

    /// Canonical name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CommitMsg => "commit-msg",
            Self::PostCheckout => "post-checkout",
            Self::PostCommit => "post-commit",
            Self::PostMerge => "post-merge",
            Self::PostRewrite => "post-rewrite",
            Self::PreCommit => "pre-commit",
            Self::PreMergeCommit => "pre-merge-commit",
            Self::PrePush => "pre-push",
            Self::PreRebase => "pre-rebase",
            Self::PrepareCommitMsg => "prepare-commit-msg",
            Self::Manual => "manual",
        }
    }

    /// Whether this stage can be installed as a Git hook script.
    #[must_use]
    pub const fn is_hook_type(&self) -> bool {
        !matches!(self, Self::Manual)
    }

    /// Parses a stage name, accepting the legacy aliases
    /// `commit`, `push` and `merge-commit`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let canonical = match name {
            "commit" => "pre-commit",
            "push" => "pre-push",
            "merge-commit" => "pre-merge-commit",
            other => other,
        };
        Self::ALL.into_iter().find(|s| s.name() == canonical)
    }

    /// Returns true if `name` is a legacy alias rather than a canonical name.
    #[must_use]
    pub fn is_legacy_alias(name: &str) -> bool {
        matches!(name, "commit" | "push" | "merge-commit")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(Self::name).collect();
            format!("Unknown stage: {s}. Expected one of: {}", known.join(", "))
        })
    }
}
