//! The pre-commit hook manifest (`.pre-commit-config.yaml`).
//!
//! The manifest is a declarative document consumed by the external pre-commit
//! runner: an ordered list of hook sources, each pinned to a revision and
//! exporting one or more hooks, plus global settings (installed hook types,
//! default stages, fail-fast, minimum runner version).
//!
//! This module models the document and answers questions about it:
//! - [`validate`]: schema and invariant checks
//! - [`lint`]: cross-tool consistency checks
//! - [`resolve`]: checks that every source and hook id exists upstream
//! - [`stage`]: the lifecycle stages the runner knows about

pub mod lint;
pub mod report;
pub mod resolve;
pub mod stage;
pub mod validate;

use crate::core::error::{Error, Result};
use crate::core::git::GitRepo;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use report::{Diagnostic, Report, Severity};
pub use stage::Stage;

/// Manifest file name consumed by the pre-commit runner.
pub const MANIFEST_FILE_NAME: &str = ".pre-commit-config.yaml";

/// File a hook source exports its hook definitions in.
pub const HOOKS_FILE_NAME: &str = ".pre-commit-hooks.yaml";

/// Pseudo-repository for hooks defined inline in the manifest.
pub const LOCAL_REPO: &str = "local";

/// Pseudo-repository for the runner's own meta hooks.
pub const META_REPO: &str = "meta";

/// The canonical manifest of this repository.
const DEFAULT_DOCUMENT: &str = r#"default_install_hook_types: [pre-commit, commit-msg]
default_stages: [pre-commit]
fail_fast: true
minimum_pre_commit_version: "3.2.0"

repos:
  - repo: https://github.com/PyCQA/isort
    rev: 5.13.2
    hooks:
      - id: isort

  - repo: https://github.com/psf/black-pre-commit-mirror
    rev: 24.4.2
    hooks:
      - id: black
        args: [--line-length=89]

  - repo: https://github.com/PyCQA/flake8
    rev: 7.1.0
    hooks:
      - id: flake8
        additional_dependencies:
          - flake8-bugbear==24.4.26
          - flake8-comprehensions==3.14.0
        args: [--max-line-length=89, --ignore=E203]

  - repo: local
    hooks:
      - id: format-commit-msg
        name: Format commit message from branch name
        entry: commit-hooks format-msg
        language: system
        stages: [commit-msg]
"#;

/// The whole manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Hook types `pre-commit install` installs by default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_install_hook_types: Vec<String>,

    /// Stages hooks run at unless they say otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_stages: Vec<String>,

    /// Language version defaults, e.g. `python: python3.12`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_language_version: BTreeMap<String, String>,

    /// Global include regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,

    /// Global exclude regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Stop running hooks after the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Oldest runner version able to read this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_pre_commit_version: Option<String>,

    /// Settings for the hosted CI service; opaque to the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci: Option<Value>,

    /// Hook sources, in execution order.
    pub repos: Vec<RepoEntry>,

    /// Keys the runner does not recognize.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Where a hook source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    /// A Git repository fetched at a pinned revision.
    Remote,
    /// Hooks defined inline (`repo: local`).
    Local,
    /// The runner's built-in hooks (`repo: meta`).
    Meta,
}

/// One hook source entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoEntry {
    /// Repository locator (URL, path, `local` or `meta`).
    pub repo: String,

    /// Pinned revision; required for remote sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Hooks used from this source, in execution order.
    pub hooks: Vec<HookDecl>,

    /// Keys the runner does not recognize.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RepoEntry {
    /// Classifies the locator.
    #[must_use]
    pub fn kind(&self) -> RepoKind {
        match self.repo.as_str() {
            LOCAL_REPO => RepoKind::Local,
            META_REPO => RepoKind::Meta,
            _ => RepoKind::Remote,
        }
    }
}

/// A hook used from a source, with per-use overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookDecl {
    /// Identifier exported by the source.
    pub id: String,

    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Command to run; only meaningful for local hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Hook language; only meaningful for local hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Extra arguments, passed verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra packages installed into the hook environment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_dependencies: Vec<String>,

    /// Stages this hook runs at, overriding `default_stages`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,

    /// Include regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,

    /// Exclude regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Language version override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,

    /// Other hook keys (`types`, `always_run`, ...) and unknown keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A hook as exported by a source's `.pre-commit-hooks.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    /// Identifier manifests refer to.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Command to run.
    pub entry: String,
    /// Language the hook is installed with.
    pub language: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stages the hook supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,
    /// Default arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Whether filenames are appended to the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_filenames: Option<bool>,
    /// Run even when no files match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,
}

impl HookDefinition {
    /// Parses the contents of a `.pre-commit-hooks.yaml` file.
    pub fn parse_list(path: &Path, content: &str) -> Result<Vec<Self>> {
        serde_yaml::from_str(content).map_err(|e| Error::manifest_parse(path, e))
    }
}

/// A hook scheduled for a stage, with the source it comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledHook<'a> {
    /// Index of the source entry in `repos`.
    pub repo_index: usize,
    /// Source entry.
    pub source: &'a RepoEntry,
    /// Hook declaration.
    pub hook: &'a HookDecl,
}

impl Default for Manifest {
    fn default() -> Self {
        // Falls back to an empty manifest if the embedded document breaks.
        Self::parse(DEFAULT_DOCUMENT).unwrap_or_else(|e| {
            tracing::error!(error = %e, "embedded manifest failed to parse");
            Self::empty()
        })
    }
}

impl Manifest {
    /// A manifest with no sources.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            default_install_hook_types: Vec::new(),
            default_stages: Vec::new(),
            default_language_version: BTreeMap::new(),
            files: None,
            exclude: None,
            fail_fast: false,
            minimum_pre_commit_version: None,
            ci: None,
            repos: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// The canonical manifest text written by `manifest init`.
    #[must_use]
    pub const fn default_document() -> &'static str {
        DEFAULT_DOCUMENT
    }

    /// Parses a manifest from YAML text.
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_at(Path::new(MANIFEST_FILE_NAME), content)
    }

    fn parse_at(path: &Path, content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::manifest_parse(path, e))
    }

    /// Loads a manifest from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read manifest", e))?;
        let manifest = Self::parse_at(path, &content)?;

        tracing::debug!(
            path = %path.display(),
            sources = manifest.repos.len(),
            "loaded hook manifest"
        );

        Ok(manifest)
    }

    /// Locates the manifest for a working directory.
    ///
    /// A relative `configured` path is taken from the repository root, or
    /// from `start` outside a repository.
    pub fn find(start: &Path, configured: &str) -> Result<PathBuf> {
        let configured = Path::new(configured);
        let path = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            match GitRepo::discover_from(start) {
                Ok(repo) => repo.root().join(configured),
                Err(Error::NotGitRepo) => start.join(configured),
                Err(e) => return Err(e),
            }
        };

        if path.exists() {
            Ok(path)
        } else {
            Err(Error::ManifestNotFound { path })
        }
    }

    /// Serializes the manifest back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Internal {
            message: format!("Failed to serialize manifest: {e}"),
        })
    }

    /// Parsed `default_stages`, ignoring unknown names.
    #[must_use]
    pub fn default_stage_set(&self) -> Vec<Stage> {
        parse_stages(&self.default_stages)
    }

    /// Every `(source, hook)` pair in document order.
    pub fn hooks(&self) -> impl Iterator<Item = ScheduledHook<'_>> {
        self.repos.iter().enumerate().flat_map(|(repo_index, source)| {
            source.hooks.iter().map(move |hook| ScheduledHook {
                repo_index,
                source,
                hook,
            })
        })
    }

    /// Every hook id, paired with its source locator, in document order.
    #[must_use]
    pub fn hook_ids(&self) -> Vec<(&str, &str)> {
        self.hooks()
            .map(|s| (s.source.repo.as_str(), s.hook.id.as_str()))
            .collect()
    }

    /// Finds the first declaration of hook `id`.
    #[must_use]
    pub fn find_hook(&self, id: &str) -> Option<&HookDecl> {
        self.hooks().find(|s| s.hook.id == id).map(|s| s.hook)
    }

    /// The hooks the runner executes at `stage`, in execution order.
    ///
    /// A hook's own `stages` wins over `default_stages`; with neither set the
    /// hook runs at every stage. Under `fail_fast` the runner stops at the
    /// first failing hook in this order.
    #[must_use]
    pub fn hooks_for_stage(&self, stage: Stage) -> Vec<ScheduledHook<'_>> {
        self.hooks()
            .filter(|s| {
                let stages = self.stages_of(s.hook);
                stages.is_empty() || stages.contains(&stage)
            })
            .collect()
    }

    /// Stages `hook` runs at. Empty means every stage.
    #[must_use]
    pub fn stages_of(&self, hook: &HookDecl) -> Vec<Stage> {
        hook.stages
            .as_deref()
            .map_or_else(|| self.default_stage_set(), parse_stages)
    }
}

fn parse_stages(names: &[String]) -> Vec<Stage> {
    names.iter().filter_map(|n| Stage::parse(n)).collect()
}
