//! Core functionality for commit-hooks.
//!
//! This module contains the shared building blocks:
//! - [`error`]: Error types and result handling
//! - [`executor`]: Async subprocess execution with timeouts
//! - [`git`]: Git repository operations

pub mod error;
pub mod executor;
pub mod git;
