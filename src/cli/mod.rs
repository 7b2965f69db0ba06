//! Command-line interface for commit-hooks.
//!
//! This module provides the `commit-hooks` CLI with subcommands for:
//! - `format-msg`: Format a commit message file from the branch name
//! - `init`: Initialize configuration
//! - `install`: Install the commit-msg git hook
//! - `uninstall`: Remove the commit-msg git hook
//! - `validate`: Validate configuration
//! - `manifest`: Check, list and resolve the pre-commit hook manifest

mod commands;

use crate::core::error::Result;
use crate::manifest::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Commit message formatting and pre-commit manifest tooling.
#[derive(Debug, Parser)]
#[command(
    name = "commit-hooks",
    author,
    version,
    about = "Commit message formatting and pre-commit manifest tooling",
    long_about = r#"
commit-hooks rewrites commit messages from the branch name and keeps the
pre-commit hook manifest (.pre-commit-config.yaml) honest.

On a branch named <type>/<ISSUE>/..., a message "my change" becomes
"ISSUE(type): my change". A "fix:" prefix overrides the branch type;
"skip:" leaves the message alone.

Quick start:
  commit-hooks init             # Create configuration
  commit-hooks install          # Install commit-msg hook
  commit-hooks manifest check   # Validate and lint the hook manifest

Environment variables:
  COMMIT_HOOKS_SKIP=1   Leave commit messages untouched
  RUST_LOG=debug        Override the log filter
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Format a commit message file from the branch name.
    #[command(visible_alias = "fmt")]
    FormatMsg {
        /// Commit message file (as passed to the commit-msg hook).
        file: PathBuf,

        /// Branch to take type and issue from (defaults to the current branch).
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Initialize commit-hooks configuration.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Install the git commit-msg hook.
    Install {
        /// Overwrite existing hook.
        #[arg(short, long)]
        force: bool,
    },

    /// Remove the git commit-msg hook.
    Uninstall,

    /// Validate the configuration file.
    #[command(visible_alias = "v")]
    Validate,

    /// Show configuration file location and contents.
    Config {
        /// Output raw TOML.
        #[arg(long)]
        raw: bool,
    },

    /// Work with the pre-commit hook manifest.
    #[command(subcommand, visible_alias = "m")]
    Manifest(ManifestCommand),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Hook manifest subcommands.
#[derive(Debug, Subcommand)]
pub enum ManifestCommand {
    /// Write the default .pre-commit-config.yaml.
    Init {
        /// Overwrite an existing manifest.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate and lint the manifest.
    #[command(visible_alias = "c")]
    Check {
        /// Manifest path (defaults to the configured one).
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// List hooks in execution order.
    #[command(visible_alias = "l")]
    List {
        /// Only hooks that run at this stage.
        #[arg(short, long)]
        stage: Option<Stage>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check that every source revision and hook id exists upstream.
    #[command(visible_alias = "r")]
    Resolve {
        /// Manifest path (defaults to the configured one).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.verbose, cli.quiet);

    // Set up color
    setup_color(cli.color);

    match cli.command {
        Commands::FormatMsg { file, branch } => commands::format_msg(&file, branch.as_deref()),
        Commands::Init { force } => commands::init(force),
        Commands::Install { force } => commands::install(force),
        Commands::Uninstall => commands::uninstall(),
        Commands::Validate => commands::validate(),
        Commands::Config { raw } => commands::config(raw),
        Commands::Manifest(command) => match command {
            ManifestCommand::Init { force } => commands::manifest_init(force),
            ManifestCommand::Check { path, strict, json } => {
                commands::manifest_check(path.as_deref(), strict, json)
            },
            ManifestCommand::List { stage, json } => commands::manifest_list(stage, json),
            ManifestCommand::Resolve { path } => commands::manifest_resolve(path.as_deref()),
        },
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
