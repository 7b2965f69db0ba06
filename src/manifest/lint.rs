//! Cross-tool consistency checks.
//!
//! The formatter (`black`) and the style checker (`flake8`) are configured
//! independently, so nothing stops them from disagreeing: black wraps at one
//! width while flake8 flags at another, or flake8 reports whitespace that
//! black deliberately emits (`E203`). The linter reports such conflicts as
//! warnings.

use super::report::Report;
use super::{HookDecl, Manifest};

/// Formatter hook id.
pub const FORMATTER_ID: &str = "black";

/// Style checker hook id.
pub const CHECKER_ID: &str = "flake8";

/// black's line length when no argument is given.
pub const FORMATTER_DEFAULT_LINE_LENGTH: usize = 88;

/// flake8's `--max-line-length` when no argument is given.
pub const CHECKER_DEFAULT_LINE_LENGTH: usize = 79;

/// Whitespace before `:` in slices, which black emits.
const SLICE_WHITESPACE_RULE: &str = "E203";

/// Line-length limits as configured in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLimits {
    /// Formatter limit, if the formatter is declared.
    pub formatter: Option<usize>,
    /// Style checker limit, if the checker is declared.
    pub checker: Option<usize>,
}

impl LineLimits {
    /// Reads the limits from the manifest's hook arguments.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            formatter: manifest.find_hook(FORMATTER_ID).map(|hook| {
                parse_limit(hook, "--line-length", Some("-l"))
                    .unwrap_or(FORMATTER_DEFAULT_LINE_LENGTH)
            }),
            checker: manifest.find_hook(CHECKER_ID).map(|hook| {
                parse_limit(hook, "--max-line-length", None).unwrap_or(CHECKER_DEFAULT_LINE_LENGTH)
            }),
        }
    }

    /// The limit a committed line must respect: the stricter of the two.
    #[must_use]
    pub fn effective(&self) -> Option<usize> {
        match (self.formatter, self.checker) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// The effective line limit of a manifest.
#[must_use]
pub fn line_limit(manifest: &Manifest) -> Option<usize> {
    LineLimits::from_manifest(manifest).effective()
}

/// Whether `line` is longer than `limit` characters.
///
/// A line of exactly `limit` characters passes.
#[must_use]
pub fn exceeds_limit(line: &str, limit: usize) -> bool {
    line.trim_end_matches(['\r', '\n']).chars().count() > limit
}

/// Lints a manifest. Only produces warnings.
#[must_use]
pub fn lint(manifest: &Manifest) -> Report {
    let mut report = Report::new();

    let limits = LineLimits::from_manifest(manifest);
    if let (Some(formatter), Some(checker)) = (limits.formatter, limits.checker) {
        if formatter != checker {
            report.warning(
                location_of(manifest, CHECKER_ID),
                format!(
                    "{FORMATTER_ID} wraps at {formatter} characters but {CHECKER_ID} flags lines \
                     over {checker}"
                ),
            );
        }
    }

    if manifest.find_hook(FORMATTER_ID).is_some() {
        if let Some(checker) = manifest.find_hook(CHECKER_ID) {
            if !ignores_rule(checker, SLICE_WHITESPACE_RULE) {
                report.warning(
                    location_of(manifest, CHECKER_ID),
                    format!(
                        "{CHECKER_ID} should ignore {SLICE_WHITESPACE_RULE}, which conflicts \
                         with {FORMATTER_ID}'s slice formatting"
                    ),
                );
            }
        }
    }

    report
}

/// Location of the first declaration of `id`, for diagnostics.
fn location_of(manifest: &Manifest, id: &str) -> String {
    manifest
        .hooks()
        .find(|s| s.hook.id == id)
        .map_or_else(
            || "repos".to_string(),
            |s| {
                let j = manifest.repos[s.repo_index]
                    .hooks
                    .iter()
                    .position(|h| h.id == id)
                    .unwrap_or_default();
                format!("repos[{}].hooks[{j}].args", s.repo_index)
            },
        )
}

/// Finds the value of an option among hook arguments.
///
/// Handles `--opt=V`, `--opt V`, `-s V` and `-sV`. The last occurrence wins,
/// as with the tools themselves.
fn option_value<'a>(args: &'a [String], long: &str, short: Option<&str>) -> Option<&'a str> {
    let mut found = None;
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix(long).and_then(|r| r.strip_prefix('=')) {
            found = Some(value);
        } else if arg == long {
            found = iter.next().map(String::as_str);
        } else if let Some(short) = short.filter(|_| !arg.starts_with("--")) {
            if arg == short {
                found = iter.next().map(String::as_str);
            } else if let Some(value) = arg.strip_prefix(short).filter(|v| !v.is_empty()) {
                found = Some(value);
            }
        }
    }

    found
}

fn parse_limit(hook: &HookDecl, long: &str, short: Option<&str>) -> Option<usize> {
    option_value(&hook.args, long, short).and_then(|v| v.trim().parse().ok())
}

/// Whether the checker's `--ignore`/`--extend-ignore` lists cover `rule`.
///
/// flake8 matches codes by prefix, so `E2` ignores `E203`.
fn ignores_rule(hook: &HookDecl, rule: &str) -> bool {
    ["--ignore", "--extend-ignore"].iter().any(|flag| {
        option_value(&hook.args, flag, None).is_some_and(|codes| {
            codes
                .split(',')
                .map(str::trim)
                .any(|code| !code.is_empty() && rule.starts_with(code))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn hook(args: &[&str]) -> HookDecl {
        HookDecl {
            id: "x".to_string(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            ..HookDecl::default()
        }
    }

    fn manifest_with(black_args: &str, flake8_args: &str) -> Manifest {
        Manifest::parse(&format!(
            r#"
repos:
  - repo: https://github.com/psf/black-pre-commit-mirror
    rev: 24.4.2
    hooks:
      - id: black
        args: {black_args}
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
        args: {flake8_args}
"#
        ))
        .expect("parse")
    }

    #[test]
    fn test_default_manifest_lints_clean() {
        let manifest = Manifest::default();
        assert!(lint(&manifest).is_empty());
        assert_eq!(line_limit(&manifest), Some(89));
    }

    #[test]
    fn test_line_of_exactly_limit_passes() {
        let limit = line_limit(&Manifest::default()).expect("limit");
        let at_limit = "x".repeat(89);
        let over_limit = "x".repeat(90);

        assert!(!exceeds_limit(&at_limit, limit));
        assert!(exceeds_limit(&over_limit, limit));
        assert!(!exceeds_limit(&format!("{at_limit}\n"), limit));
    }

    #[test]
    fn test_exceeds_limit_counts_characters() {
        // 89 multi-byte characters
        assert!(!exceeds_limit(&"é".repeat(89), 89));
    }

    #[rstest]
    #[case(&["--line-length=100"], Some("100"))]
    #[case(&["--line-length", "100"], Some("100"))]
    #[case(&["-l", "100"], Some("100"))]
    #[case(&["-l100"], Some("100"))]
    #[case(&["-l80", "--line-length=90"], Some("90"))]
    #[case(&["--line-lengthy=3"], None)]
    #[case(&[], None)]
    fn test_option_value(#[case] args: &[&str], #[case] expected: Option<&str>) {
        let hook = hook(args);
        assert_eq!(option_value(&hook.args, "--line-length", Some("-l")), expected);
    }

    #[test]
    fn test_mismatched_line_lengths_warn() {
        let report = lint(&manifest_with("[--line-length=100]", "[--max-line-length=89, --ignore=E203]"));
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.at("repos[1].hooks[0].args").count(), 1);
        assert!(report.diagnostics()[0].message.contains("100"));
    }

    #[test]
    fn test_tool_defaults_disagree() {
        let manifest = manifest_with("[]", "[--ignore=E203]");
        let limits = LineLimits::from_manifest(&manifest);
        assert_eq!(limits.formatter, Some(88));
        assert_eq!(limits.checker, Some(79));
        assert_eq!(limits.effective(), Some(79));
        assert_eq!(lint(&manifest).warning_count(), 1);
    }

    #[rstest]
    #[case("[--max-line-length=89]", false)]
    #[case("[--max-line-length=89, --ignore=E203]", true)]
    #[case("[--max-line-length=89, \"--extend-ignore=W503,E203\"]", true)]
    #[case("[--max-line-length=89, --ignore=E2]", true)]
    #[case("[--max-line-length=89, --ignore=E20301]", false)]
    fn test_slice_whitespace_rule(#[case] flake8_args: &str, #[case] ignored: bool) {
        let report = lint(&manifest_with("[--line-length=89]", flake8_args));
        assert_eq!(report.is_empty(), ignored);
    }

    #[test]
    fn test_checker_alone_is_not_linted() {
        let manifest = Manifest::parse(
            r#"
repos:
  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
"#,
        )
        .expect("parse");
        assert!(lint(&manifest).is_empty());
        assert_eq!(line_limit(&manifest), Some(79));
    }
}
