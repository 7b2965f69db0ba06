//! # commit-hooks
//!
//! Commit message formatting and pre-commit manifest tooling.
//!
//! Branches named `<type>/<ISSUE>/...` carry a conventional commit type and an
//! issue key; `commit-hooks` rewrites commit messages to `ISSUE(type): message`
//! from them. It also validates, lints and resolves the repository's
//! `.pre-commit-config.yaml` so a broken hook pipeline is caught before the
//! first commit instead of during it.
//!
//! ## Features
//!
//! - **Commit message formatting**: Derives type and issue from the branch name,
//!   with `type:` prefixes overriding the branch and `skip:` opting out
//! - **Manifest validation**: Stage names, pinned revisions, hook ids, regexes
//! - **Cross-tool linting**: Formatter and style checker agree on line length
//! - **Resolution**: Every source revision and hook id exists upstream
//!
//! ## Example
//!
//! ```rust,no_run
//! use commit_hooks::{CommitMessage, Config, Manifest};
//!
//! fn main() -> commit_hooks::Result<()> {
//!     let config = Config::load_or_default()?;
//!
//!     let formatter = CommitMessage::new(&config.commit_msg, Some("feat/PROJ-12/login"))?;
//!     let formatted = formatter.format("add login form")?;
//!     assert_eq!(formatted.message, "PROJ-12(feat): add login form");
//!
//!     let manifest = Manifest::load_from(".pre-commit-config.yaml".as_ref())?;
//!     let report = commit_hooks::manifest::validate::validate(&manifest);
//!     assert!(report.is_valid());
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/commit-hooks/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod commit_msg;
pub mod config;
pub mod core;
pub mod manifest;

// Re-export main types for convenience
pub use commit_msg::{BranchInfo, CommitMessage, Formatted};
pub use config::Config;
pub use core::error::{Error, Result};
pub use manifest::resolve::{Outcome, Resolver, SourceResolution};
pub use manifest::{Manifest, Report, Stage};
