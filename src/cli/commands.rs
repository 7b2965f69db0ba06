//! CLI command implementations.

use crate::commit_msg::CommitMessage;
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::git::GitRepo;
use crate::manifest::lint::lint;
use crate::manifest::resolve::{Outcome, Resolver};
use crate::manifest::validate::validate as validate_manifest;
use crate::manifest::{Manifest, Severity, Stage};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Hook script template.
const HOOK_SCRIPT: &str = r#"#!/bin/sh
# commit-hooks hook - installed by `commit-hooks install`

# Skip if COMMIT_HOOKS_SKIP is set
if [ "$COMMIT_HOOKS_SKIP" = "1" ]; then
    exit 0
fi

# Format the commit message from the branch name
exec commit-hooks format-msg "$1"
"#;

/// Hook marker comment.
const HOOK_MARKER: &str = "# commit-hooks hook";

/// Git hook the script is installed as.
const HOOK_NAME: &str = "commit-msg";

/// Environment variable that disables formatting.
const SKIP_ENV: &str = "COMMIT_HOOKS_SKIP";

/// Format a commit message file.
pub fn format_msg(file: &Path, branch: Option<&str>) -> Result<ExitCode> {
    if std::env::var(SKIP_ENV).ok().as_deref() == Some("1") {
        eprintln!("{} Skipping commit message formatting ({SKIP_ENV}=1)", style("•").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load_or_default()?;

    let branch = match branch {
        Some(b) => Some(b.to_string()),
        None => GitRepo::discover()?.current_branch()?,
    };

    let result = CommitMessage::new(&config.commit_msg, branch.as_deref())
        .and_then(|formatter| formatter.format_file(file));

    match result {
        Ok(formatted) => {
            if formatted.skipped {
                eprintln!("{} Skip prefix found, message left as written", style("•").cyan());
            } else if !formatted.unchanged {
                let subject = formatted.message.lines().next().unwrap_or_default();
                eprintln!("{} {subject}", style("✓").green());
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(e) if e.is_commit_msg_error() => {
            eprintln!("{} {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
        Err(e) => Err(e),
    }
}

/// Initialize configuration.
pub fn init(force: bool) -> Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    // Check if config already exists
    if config_path.exists() && !force && !confirm_overwrite(&config_path)? {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(&config_path, Config::default_toml())
        .map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());

    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {CONFIG_FILE_NAME}");
    eprintln!("  2. Run: commit-hooks install");

    Ok(ExitCode::SUCCESS)
}

/// Install git hook.
pub fn install(force: bool) -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let hooks_dir = repo.hooks_dir();
    let hook_path = hooks_dir.join(HOOK_NAME);

    // Create hooks directory if needed
    if !hooks_dir.exists() {
        std::fs::create_dir_all(&hooks_dir).map_err(|e| Error::io("create hooks dir", e))?;
    }

    // Check for existing hook
    if hook_path.exists() {
        let content =
            std::fs::read_to_string(&hook_path).map_err(|e| Error::io("read existing hook", e))?;

        // Check if it's our hook
        if content.contains(HOOK_MARKER) {
            eprintln!(
                "{} Hook already installed at {}",
                style("✓").green(),
                hook_path.display()
            );
            return Ok(ExitCode::SUCCESS);
        }

        if !force {
            return Err(Error::HookExists { path: hook_path });
        }

        // Backup existing hook
        let backup_path = hooks_dir.join(format!("{HOOK_NAME}.bak"));
        std::fs::rename(&hook_path, &backup_path).map_err(|e| Error::io("backup hook", e))?;
        eprintln!(
            "{} Backed up existing hook to {}",
            style("•").cyan(),
            backup_path.display()
        );
    }

    // Write hook
    std::fs::write(&hook_path, HOOK_SCRIPT).map_err(|e| Error::io("write hook", e))?;

    // Make executable on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&hook_path)
            .map_err(|e| Error::io("get hook metadata", e))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&hook_path, perms).map_err(|e| Error::io("set hook perms", e))?;
    }

    eprintln!(
        "{} Installed {HOOK_NAME} hook at {}",
        style("✓").green(),
        hook_path.display()
    );

    Ok(ExitCode::SUCCESS)
}

/// Uninstall git hook.
pub fn uninstall() -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let hook_path = repo.hook_path(HOOK_NAME);

    if !hook_path.exists() {
        eprintln!(
            "{} No hook installed at {}",
            style("•").cyan(),
            hook_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    // Check if it's our hook
    let content = std::fs::read_to_string(&hook_path).map_err(|e| Error::io("read hook", e))?;

    if !content.contains(HOOK_MARKER) {
        eprintln!(
            "{} Hook at {} was not installed by commit-hooks",
            style("!").yellow(),
            hook_path.display()
        );
        eprintln!("  Remove manually if desired.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::remove_file(&hook_path).map_err(|e| Error::io("remove hook", e))?;

    eprintln!(
        "{} Removed {HOOK_NAME} hook from {}",
        style("✓").green(),
        hook_path.display()
    );

    // Check for backup
    let backup_path = repo.hooks_dir().join(format!("{HOOK_NAME}.bak"));
    if backup_path.exists() {
        eprintln!(
            "  Backup exists at {} - restore if needed",
            backup_path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate() -> Result<ExitCode> {
    match Config::load() {
        Ok(config) => match config.validate() {
            Ok(()) => {
                eprintln!("{} Configuration is valid", style("✓").green());
                Ok(ExitCode::SUCCESS)
            },
            Err(e) => {
                eprintln!("{} Configuration validation failed: {e}", style("✗").red());
                Ok(ExitCode::FAILURE)
            },
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: commit-hooks init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!("{} Failed to load configuration: {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Show configuration.
pub fn config(raw: bool) -> Result<ExitCode> {
    match Config::find_config_file() {
        Ok(path) => {
            eprintln!("Configuration file: {}", path.display());

            if raw {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io("read config", e))?;
                eprintln!();
                std::io::stdout()
                    .write_all(content.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
                return Ok(ExitCode::SUCCESS);
            }

            let config = Config::load_from(&path)?;
            eprintln!();
            eprintln!("Commit types:  {}", config.commit_msg.types.join(", "));
            eprintln!("Skip prefixes: {}", config.commit_msg.skip_prefixes.join(", "));
            eprintln!("Issue pattern: {}", config.commit_msg.issue_pattern);
            eprintln!("Manifest:      {}", config.manifest.path);
            eprintln!(
                "Resolve timeout: {}",
                humantime::format_duration(config.manifest.resolve_timeout())
            );

            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { .. }) => {
            eprintln!("{} No configuration file found", style("!").yellow());
            eprintln!("  Run: commit-hooks init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => Err(e),
    }
}

/// Write the default hook manifest.
pub fn manifest_init(force: bool) -> Result<ExitCode> {
    let config = Config::load_or_default()?;
    let cwd = current_dir()?;

    let path = match Manifest::find(&cwd, &config.manifest.path) {
        Ok(path) => {
            if !force && !confirm_overwrite(&path)? {
                eprintln!(
                    "{} Hook manifest already exists: {}",
                    style("!").yellow(),
                    path.display()
                );
                eprintln!("  Use --force to overwrite.");
                return Ok(ExitCode::FAILURE);
            }
            path
        },
        Err(Error::ManifestNotFound { path }) => path,
        Err(e) => return Err(e),
    };

    std::fs::write(&path, Manifest::default_document())
        .map_err(|e| Error::io("write manifest", e))?;

    eprintln!("{} Created {}", style("✓").green(), path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Run: pre-commit install");
    eprintln!("  2. Run: commit-hooks manifest resolve");

    Ok(ExitCode::SUCCESS)
}

/// Validate and lint the hook manifest.
pub fn manifest_check(path: Option<&Path>, strict: bool, json: bool) -> Result<ExitCode> {
    let config = Config::load_or_default()?;
    let path = manifest_path(path, &config)?;
    let manifest = Manifest::load_from(&path)?;

    let mut report = validate_manifest(&manifest);
    report.merge(lint(&manifest));

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| Error::Internal {
            message: format!("Failed to serialize report: {e}"),
        })?;
        println!("{out}");
    }

    for diagnostic in report.diagnostics() {
        let glyph = match diagnostic.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("!").yellow(),
        };
        eprintln!("{glyph} {}: {}", diagnostic.location, diagnostic.message);
    }

    let errors = report.error_count();
    let warnings = report.warning_count();

    if errors > 0 || (strict && warnings > 0) {
        eprintln!(
            "{} {} has {errors} error(s) and {warnings} warning(s)",
            style("✗").red().bold(),
            path.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    let hook_count = manifest.hooks().count();
    if warnings > 0 {
        eprintln!(
            "{} {} is valid ({hook_count} hooks, {warnings} warning(s))",
            style("✓").green(),
            path.display()
        );
    } else {
        eprintln!(
            "{} {} is valid ({hook_count} hooks)",
            style("✓").green(),
            path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// One hook in `manifest list --json` output.
#[derive(Debug, serde::Serialize)]
struct ListedHook<'a> {
    id: &'a str,
    repo: &'a str,
    rev: Option<&'a str>,
    stages: Vec<&'static str>,
    args: &'a [String],
}

/// List hooks in execution order.
pub fn manifest_list(stage: Option<Stage>, json: bool) -> Result<ExitCode> {
    let config = Config::load_or_default()?;
    let path = manifest_path(None, &config)?;
    let manifest = Manifest::load_from(&path)?;

    let hooks = match stage {
        Some(stage) => manifest.hooks_for_stage(stage),
        None => manifest.hooks().collect(),
    };

    if json {
        let listed: Vec<_> = hooks
            .iter()
            .map(|s| ListedHook {
                id: &s.hook.id,
                repo: &s.source.repo,
                rev: s.source.rev.as_deref(),
                stages: manifest.stages_of(s.hook).iter().map(Stage::name).collect(),
                args: &s.hook.args,
            })
            .collect();
        let output = serde_json::to_string_pretty(&listed).map_err(|e| Error::Internal {
            message: format!("Failed to serialize hooks: {e}"),
        })?;
        println!("{output}");
        return Ok(ExitCode::SUCCESS);
    }

    let heading = match stage {
        Some(stage) => format!("Hooks at {stage}:"),
        None => "Hooks:".to_string(),
    };
    eprintln!("{}", style(heading).bold());

    for (position, scheduled) in hooks.iter().enumerate() {
        let source = match scheduled.source.rev.as_deref() {
            Some(rev) => format!("{}@{rev}", scheduled.source.repo),
            None => scheduled.source.repo.clone(),
        };
        eprintln!(
            "  {}. {} - {}",
            position + 1,
            style(&scheduled.hook.id).cyan(),
            source
        );
    }

    if manifest.fail_fast && hooks.len() > 1 {
        eprintln!();
        eprintln!("  fail_fast: the first failing hook stops the rest");
    }

    Ok(ExitCode::SUCCESS)
}

/// Resolve hook sources against their repositories.
pub fn manifest_resolve(path: Option<&Path>) -> Result<ExitCode> {
    let config = Config::load_or_default()?;
    let path = manifest_path(path, &config)?;
    let manifest = Manifest::load_from(&path)?;

    let report = validate_manifest(&manifest);
    if !report.is_valid() {
        for diagnostic in report.diagnostics() {
            if diagnostic.severity == Severity::Error {
                eprintln!("{} {diagnostic}", style("✗").red());
            }
        }
        return Err(Error::ManifestInvalid {
            count: report.error_count(),
        });
    }

    let resolver = Resolver::with_default_cache(config.manifest.resolve_timeout())?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .ok()
            .unwrap_or_else(ProgressStyle::default_spinner),
    );
    pb.set_message(format!("Resolving {} hook source(s)...", manifest.repos.len()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let results = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create runtime: {e}"),
        })?
        .block_on(resolver.resolve(&manifest));

    pb.finish_and_clear();
    let results = results?;

    for resolution in &results {
        let glyph = match &resolution.outcome {
            Outcome::Resolved { .. } => style("✓").green(),
            Outcome::Skipped { .. } | Outcome::NotAttempted => style("•").cyan(),
            _ => style("✗").red(),
        };
        let source = match resolution.rev.as_deref() {
            Some(rev) => format!("{}@{rev}", resolution.repo),
            None => resolution.repo.clone(),
        };
        match resolution.outcome {
            Outcome::Skipped { .. } | Outcome::NotAttempted => {
                eprintln!("{glyph} {source}: {}", resolution.outcome);
            },
            _ => eprintln!(
                "{glyph} {source}: {} {}",
                resolution.outcome,
                style(format!("({:.2}s)", resolution.duration.as_secs_f64())).dim()
            ),
        }
    }

    let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
    eprintln!();
    if failed == 0 {
        eprintln!(
            "{} All hook sources resolved ({})",
            style("✓").green().bold(),
            resolver.cache_dir().display()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} {failed} hook source(s) failed", style("✗").red().bold());
        Ok(ExitCode::FAILURE)
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "commit-hooks",
        &mut std::io::stdout(),
    );
}

/// The manifest to operate on: an explicit path or the configured one.
fn manifest_path(explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Error::ManifestNotFound {
            path: path.to_path_buf(),
        }),
        None => Manifest::find(&current_dir()?, &config.manifest.path),
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| Error::io("get current directory", e))
}

/// Asks before overwriting `path`. Never overwrites without a terminal.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        return Ok(false);
    }

    dialoguer::Confirm::new()
        .with_prompt(format!("{} exists. Overwrite?", path.display()))
        .default(false)
        .interact()
        .map_err(|e| Error::Internal {
            message: format!("Failed to read confirmation: {e}"),
        })
}
