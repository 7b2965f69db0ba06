//! Schema and invariant checks for a parsed manifest.
//!
//! Parsing already rejects malformed YAML and wrong value types. Validation
//! covers what a well-typed document can still get wrong: unknown stage
//! names, unpinned sources, empty ids, broken regexes.

use super::report::Report;
use super::stage::Stage;
use super::{HookDecl, Manifest, RepoEntry, RepoKind};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Revisions that name a moving branch instead of an immutable tag.
const MOVING_REVISIONS: &[&str] = &["main", "master", "HEAD", "develop", "trunk"];

/// URL schemes git can fetch from.
const URL_SCHEMES: &[&str] = &["https://", "http://", "ssh://", "git://", "file://"];

/// Hook keys the runner accepts besides the ones modelled on [`HookDecl`].
const KNOWN_HOOK_KEYS: &[&str] = &[
    "alias",
    "always_run",
    "description",
    "exclude_types",
    "fail_fast",
    "log_file",
    "minimum_pre_commit_version",
    "pass_filenames",
    "require_serial",
    "types",
    "types_or",
    "verbose",
];

/// Validates a manifest.
#[must_use]
pub fn validate(manifest: &Manifest) -> Report {
    let mut report = Report::new();

    for key in manifest.extra.keys() {
        report.warning(key.as_str(), "unexpected key, the runner will ignore it");
    }

    for (i, name) in manifest.default_install_hook_types.iter().enumerate() {
        let location = format!("default_install_hook_types[{i}]");
        match Stage::parse(name) {
            Some(stage) if stage.is_hook_type() => {},
            Some(_) => report.error(location, format!("'{name}' cannot be installed as a git hook")),
            None => report.error(location, format!("unknown hook type '{name}'")),
        }
    }

    check_stages(&mut report, "default_stages", &manifest.default_stages);

    if let Some(version) = &manifest.minimum_pre_commit_version {
        if !is_version(version) {
            report.error(
                "minimum_pre_commit_version",
                format!("'{version}' is not a version (expected X.Y.Z)"),
            );
        }
    }

    check_regex(&mut report, "files", manifest.files.as_deref());
    check_regex(&mut report, "exclude", manifest.exclude.as_deref());

    if manifest.repos.is_empty() {
        report.warning("repos", "no hook sources declared, nothing will run");
    }

    for (i, entry) in manifest.repos.iter().enumerate() {
        check_repo(&mut report, &format!("repos[{i}]"), entry);
    }

    tracing::debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validated manifest"
    );

    report
}

fn check_repo(report: &mut Report, at: &str, entry: &RepoEntry) {
    for key in entry.extra.keys() {
        report.warning(format!("{at}.{key}"), "unexpected key, the runner will ignore it");
    }

    let locator = entry.repo.trim();
    let kind = entry.kind();

    if locator.is_empty() {
        report.error(format!("{at}.repo"), "repository locator must not be empty");
    } else if kind == RepoKind::Remote && !is_repo_locator(locator) {
        report.warning(
            format!("{at}.repo"),
            format!("'{locator}' does not look like a git URL or path"),
        );
    }

    match (kind, entry.rev.as_deref().map(str::trim)) {
        (RepoKind::Remote, None | Some("")) => {
            report.error(format!("{at}.rev"), "remote hook sources must pin a revision");
        },
        (RepoKind::Remote, Some(rev)) if MOVING_REVISIONS.contains(&rev) => {
            report.warning(
                format!("{at}.rev"),
                format!("'{rev}' is a branch, pin an immutable tag or commit instead"),
            );
        },
        (RepoKind::Local | RepoKind::Meta, Some(_)) => {
            report.warning(format!("{at}.rev"), format!("'{}' sources ignore rev", entry.repo));
        },
        _ => {},
    }

    if entry.hooks.is_empty() {
        report.error(format!("{at}.hooks"), "a hook source must declare at least one hook");
    }

    let mut seen = HashSet::new();
    for (j, hook) in entry.hooks.iter().enumerate() {
        let hook_at = format!("{at}.hooks[{j}]");
        check_hook(report, &hook_at, kind, hook);

        if !hook.id.trim().is_empty() && !seen.insert(hook.id.as_str()) {
            report.warning(
                format!("{hook_at}.id"),
                format!("hook '{}' is declared more than once in this source", hook.id),
            );
        }
    }
}

fn check_hook(report: &mut Report, at: &str, kind: RepoKind, hook: &HookDecl) {
    if hook.id.trim().is_empty() {
        report.error(format!("{at}.id"), "hook id must not be empty");
    }

    if kind == RepoKind::Local {
        let required = [
            ("name", hook.name.as_deref()),
            ("entry", hook.entry.as_deref()),
            ("language", hook.language.as_deref()),
        ];
        for (field, value) in required {
            if value.map_or(true, |v| v.trim().is_empty()) {
                report.error(format!("{at}.{field}"), "local hooks must set this field");
            }
        }
    }

    for key in hook.extra.keys() {
        if !KNOWN_HOOK_KEYS.contains(&key.as_str()) {
            report.warning(format!("{at}.{key}"), "unexpected key, the runner will ignore it");
        }
    }

    if let Some(stages) = &hook.stages {
        check_stages(report, &format!("{at}.stages"), stages);
    }

    for (k, arg) in hook.args.iter().enumerate() {
        if arg.starts_with('-') && arg.split_whitespace().skip(1).any(|w| w.starts_with('-')) {
            report.warning(
                format!("{at}.args[{k}]"),
                "arguments are passed verbatim, split each flag into its own list item",
            );
        }
    }

    for (k, dep) in hook.additional_dependencies.iter().enumerate() {
        if dep.trim().is_empty() {
            report.error(
                format!("{at}.additional_dependencies[{k}]"),
                "dependency specifier must not be empty",
            );
        }
    }

    check_regex(report, &format!("{at}.files"), hook.files.as_deref());
    check_regex(report, &format!("{at}.exclude"), hook.exclude.as_deref());
}

fn check_stages(report: &mut Report, at: &str, stages: &[String]) {
    for (i, name) in stages.iter().enumerate() {
        let location = format!("{at}[{i}]");
        if Stage::parse(name).is_none() {
            report.error(location, format!("unknown stage '{name}'"));
        } else if Stage::is_legacy_alias(name) {
            report.warning(location, format!("'{name}' is a deprecated stage name"));
        }
    }
}

fn check_regex(report: &mut Report, at: &str, pattern: Option<&str>) {
    if let Some(pattern) = pattern {
        if let Err(e) = Regex::new(pattern) {
            report.error(at, format!("invalid regular expression: {e}"));
        }
    }
}

/// Dotted numeric version with one to three components.
fn is_version(s: &str) -> bool {
    let parts: Vec<_> = s.split('.').collect();
    (1..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn is_repo_locator(s: &str) -> bool {
    if URL_SCHEMES
        .iter()
        .any(|scheme| s.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
    {
        return true;
    }

    if is_scp_like(s) {
        return true;
    }

    let path = Path::new(s);
    path.is_absolute() || s.starts_with("./") || s.starts_with("../")
}

/// `user@host:path`, as accepted by `git clone`.
fn is_scp_like(s: &str) -> bool {
    let Some((user, rest)) = s.split_once('@') else {
        return false;
    };
    let Some((host, path)) = rest.split_once(':') else {
        return false;
    };
    !user.is_empty() && !host.is_empty() && !path.is_empty() && !host.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Severity;
    use rstest::rstest;

    fn parse(yaml: &str) -> Manifest {
        Manifest::parse(yaml).expect("parse manifest")
    }

    fn messages(report: &Report, location: &str) -> Vec<(Severity, String)> {
        report
            .at(location)
            .map(|d| (d.severity, d.message.clone()))
            .collect()
    }

    #[test]
    fn test_default_manifest_is_clean() {
        let report = validate(&Manifest::default());
        assert!(report.is_empty(), "unexpected diagnostics: {report:?}");
    }

    #[test]
    fn test_unknown_stage_is_an_error() {
        let report = validate(&parse(
            r#"
default_stages: [pre-commit, precommit]
repos: []
"#,
        ));
        assert!(!report.is_valid());
        assert_eq!(
            messages(&report, "default_stages[1]"),
            [(Severity::Error, "unknown stage 'precommit'".to_string())]
        );
    }

    #[test]
    fn test_legacy_stage_is_a_warning() {
        let report = validate(&parse(
            r#"
default_stages: [commit]
repos: []
"#,
        ));
        assert!(report.is_valid());
        assert_eq!(report.at("default_stages[0]").count(), 1);
    }

    #[test]
    fn test_manual_cannot_be_installed() {
        let report = validate(&parse(
            r#"
default_install_hook_types: [pre-commit, manual, pre-commmit]
repos: []
"#,
        ));
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.at("default_install_hook_types[1]").count(), 1);
        assert_eq!(report.at("default_install_hook_types[2]").count(), 1);
    }

    #[rstest]
    #[case("3.2.0", true)]
    #[case("3", true)]
    #[case("2.20", true)]
    #[case("v3.2.0", false)]
    #[case("3.2.0.1", false)]
    #[case("3..0", false)]
    #[case("", false)]
    fn test_is_version(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_version(input), expected);
    }

    #[test]
    fn test_bad_minimum_version_is_an_error() {
        let report = validate(&parse(
            r#"
minimum_pre_commit_version: latest
repos: []
"#,
        ));
        assert_eq!(report.at("minimum_pre_commit_version").count(), 1);
        assert!(!report.is_valid());
    }

    #[rstest]
    #[case("https://github.com/psf/black", true)]
    #[case("git@github.com:psf/black.git", true)]
    #[case("file:///srv/hooks", true)]
    #[case("/srv/hooks", true)]
    #[case("../hooks", true)]
    #[case("https://", false)]
    #[case("github.com/psf/black", false)]
    fn test_is_repo_locator(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_repo_locator(input), expected);
    }

    #[test]
    fn test_remote_without_rev_is_an_error() {
        let report = validate(&parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/isort
    hooks:
      - id: isort
"#,
        ));
        assert_eq!(
            messages(&report, "repos[0].rev"),
            [(
                Severity::Error,
                "remote hook sources must pin a revision".to_string()
            )]
        );
    }

    #[test]
    fn test_branch_rev_is_a_warning() {
        let report = validate(&parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/isort
    rev: main
    hooks:
      - id: isort
"#,
        ));
        assert!(report.is_valid());
        assert_eq!(report.at("repos[0].rev").count(), 1);
    }

    #[test]
    fn test_empty_id_and_duplicates() {
        let report = validate(&parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
      - id: ""
      - id: flake8
"#,
        ));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.at("repos[0].hooks[1].id").count(), 1);
        assert_eq!(
            messages(&report, "repos[0].hooks[2].id")[0].0,
            Severity::Warning
        );
    }

    #[test]
    fn test_source_without_hooks_is_an_error() {
        let report = validate(&parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks: []
"#,
        ));
        assert_eq!(report.at("repos[0].hooks").count(), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_local_hook_requires_entry_and_language() {
        let report = validate(&parse(
            r#"
repos:
  - repo: local
    hooks:
      - id: fmt
        name: fmt
"#,
        ));
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.at("repos[0].hooks[0].entry").count(), 1);
        assert_eq!(report.at("repos[0].hooks[0].language").count(), 1);
    }

    #[test]
    fn test_merged_args_warned() {
        let report = validate(&parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
        args: ["--max-line-length=89 --ignore=E203"]
"#,
        ));
        assert!(report.is_valid());
        assert_eq!(report.at("repos[0].hooks[0].args[0]").count(), 1);
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let report = validate(&parse(
            r#"
exclude: "^(docs/"
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
        files: "\\.py$"
"#,
        ));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.at("exclude").count(), 1);
    }

    #[test]
    fn test_unknown_keys_are_warnings() {
        let report = validate(&parse(
            r#"
colour: blue
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    pinned: true
    hooks:
      - id: flake8
        types: [python]
        verbosity: 3
"#,
        ));
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 3);
        assert_eq!(report.at("repos[0].hooks[0].verbosity").count(), 1);
        assert_eq!(report.at("repos[0].hooks[0].types").count(), 0);
    }

    #[test]
    fn test_empty_repos_is_a_warning() {
        let report = validate(&parse("repos: []\n"));
        assert!(report.is_valid());
        assert_eq!(report.at("repos").count(), 1);
    }
}
