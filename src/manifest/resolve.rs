//! Resolution of hook sources against their upstream repositories.
//!
//! For every remote source the resolver fetches the pinned revision into a
//! cache directory and checks each declared hook id against the source's
//! `.pre-commit-hooks.yaml`. This is what the runner does at install time;
//! doing it up front surfaces a bad `rev` or a misspelt `id` before anyone
//! commits.

use super::{HookDefinition, Manifest, RepoEntry, RepoKind, HOOKS_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::executor::{CommandOutput, ExecuteOptions, Executor};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Marker written once a checkout is complete.
const READY_MARKER: &str = "commit-hooks-ready";

/// What resolving one hook source found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The revision exists and exports every declared hook.
    Resolved {
        /// Number of hooks the source exports.
        exported: usize,
    },
    /// Nothing to resolve (`local` and `meta` sources).
    Skipped {
        /// Why.
        reason: String,
    },
    /// A remote source without `rev`.
    MissingRevision,
    /// The repository or revision could not be fetched.
    RevisionNotFound {
        /// Git's explanation.
        message: String,
    },
    /// The revision has no `.pre-commit-hooks.yaml`.
    HooksFileMissing,
    /// `.pre-commit-hooks.yaml` exists but does not parse.
    HooksFileInvalid {
        /// Parse error.
        message: String,
    },
    /// Declared ids the source does not export.
    UnknownHooks {
        /// Unknown ids, in declaration order.
        ids: Vec<String>,
        /// Ids the source does export.
        exported: Vec<String>,
    },
    /// Not attempted because an earlier source failed under fail-fast.
    NotAttempted,
}

impl Outcome {
    /// Whether this outcome would make the runner's hook installation fail.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::Resolved { .. } | Self::Skipped { .. } | Self::NotAttempted
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { exported } => write!(f, "resolved ({exported} hooks exported)"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::MissingRevision => write!(f, "no rev pinned"),
            Self::RevisionNotFound { message } => write!(f, "cannot fetch revision: {message}"),
            Self::HooksFileMissing => write!(f, "revision has no {HOOKS_FILE_NAME}"),
            Self::HooksFileInvalid { message } => write!(f, "invalid {HOOKS_FILE_NAME}: {message}"),
            Self::UnknownHooks { ids, exported } => write!(
                f,
                "unknown hook id(s) {} (exported: {})",
                ids.join(", "),
                exported.join(", ")
            ),
            Self::NotAttempted => write!(f, "not attempted (fail_fast)"),
        }
    }
}

/// Result of resolving one `repos` entry.
#[derive(Debug, Clone)]
pub struct SourceResolution {
    /// Index in `repos`.
    pub index: usize,
    /// Repository locator.
    pub repo: String,
    /// Pinned revision.
    pub rev: Option<String>,
    /// What happened.
    pub outcome: Outcome,
    /// Time spent.
    pub duration: Duration,
}

impl SourceResolution {
    fn new(index: usize, entry: &RepoEntry, outcome: Outcome, duration: Duration) -> Self {
        Self {
            index,
            repo: entry.repo.clone(),
            rev: entry.rev.clone(),
            outcome,
            duration,
        }
    }
}

/// Resolves hook sources, caching checkouts on disk.
#[derive(Debug, Clone)]
pub struct Resolver {
    executor: Executor,
    cache_dir: PathBuf,
    timeout: Duration,
    concurrency: usize,
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Resolver {
    /// Creates a resolver caching checkouts under `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executor: Executor::new(),
            cache_dir: cache_dir.into(),
            timeout,
            concurrency: default_concurrency(),
            locks: Arc::default(),
        }
    }

    /// Creates a resolver using the user's cache directory.
    pub fn with_default_cache(timeout: Duration) -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| Error::Internal {
            message: "no cache directory for this platform".to_string(),
        })?;
        Ok(Self::new(base.join("commit-hooks").join("repos"), timeout))
    }

    /// Limits how many sources are fetched at once.
    #[must_use]
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Where checkouts are cached.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolves every source in the manifest.
    ///
    /// Results are returned in manifest order. With `fail_fast` set, sources
    /// that have not started when the first failure is seen are reported as
    /// [`Outcome::NotAttempted`].
    pub async fn resolve(&self, manifest: &Manifest) -> Result<Vec<SourceResolution>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let halted = Arc::new(AtomicBool::new(false));
        let fail_fast = manifest.fail_fast;

        let mut handles = Vec::with_capacity(manifest.repos.len());

        for (index, entry) in manifest.repos.iter().enumerate() {
            let resolver = self.clone();
            let entry = entry.clone();
            let sem = Arc::clone(&semaphore);
            let halted = Arc::clone(&halted);

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.map_err(|_| Error::Internal {
                    message: "Semaphore closed unexpectedly".to_string(),
                })?;

                if halted.load(Ordering::SeqCst) {
                    return Ok(SourceResolution::new(
                        index,
                        &entry,
                        Outcome::NotAttempted,
                        Duration::ZERO,
                    ));
                }

                let resolution = resolver.resolve_entry(index, &entry).await?;
                if fail_fast && resolution.outcome.is_failure() {
                    halted.store(true, Ordering::SeqCst);
                }
                Ok::<_, Error>(resolution)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (i, handle) in handles.iter_mut().enumerate() {
            let joined = match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Internal {
                    message: format!("Task join error: {e}"),
                }),
            };
            match joined {
                Ok(resolution) => results.push(resolution),
                Err(e) => {
                    failure = Some((i, e));
                    break;
                },
            }
        }

        if let Some((i, e)) = failure {
            // Dropping a JoinHandle detaches its task
            for handle in &handles[i + 1..] {
                handle.abort();
            }
            return Err(e);
        }

        Ok(results)
    }

    /// Resolves a single `repos` entry.
    pub async fn resolve_entry(&self, index: usize, entry: &RepoEntry) -> Result<SourceResolution> {
        let start = Instant::now();

        let outcome = match entry.kind() {
            RepoKind::Local | RepoKind::Meta => Outcome::Skipped {
                reason: format!("'{}' hooks are defined in place", entry.repo),
            },
            RepoKind::Remote => {
                match entry.rev.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                    None => Outcome::MissingRevision,
                    Some(rev) => match self.checkout(&entry.repo, rev).await? {
                        Err(message) => Outcome::RevisionNotFound { message },
                        Ok(dir) => check_exported(&dir, entry).await?,
                    },
                }
            },
        };

        tracing::debug!(
            repo = %entry.repo,
            rev = entry.rev.as_deref().unwrap_or("-"),
            outcome = %outcome,
            "resolved hook source"
        );

        Ok(SourceResolution::new(index, entry, outcome, start.elapsed()))
    }

    /// Fetches `rev` of `repo` into the cache.
    ///
    /// The inner `Err` carries git's reason when the source cannot be
    /// fetched; the outer one is for local failures.
    async fn checkout(&self, repo: &str, rev: &str) -> Result<std::result::Result<PathBuf, String>> {
        let dir = self.cache_dir.join(cache_key(repo, rev));

        // Entries sharing a repo and rev share a checkout
        let lock = self.lock_for(&dir)?;
        let _guard = lock.lock().await;

        let marker = dir.join(".git").join(READY_MARKER);
        if exists(&marker).await {
            tracing::debug!(repo, rev, dir = %dir.display(), "reusing cached checkout");
            return Ok(Ok(dir));
        }

        if exists(&dir).await {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| Error::io("clear stale checkout", e))?;
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io("create checkout dir", e))?;

        let steps: [&[&str]; 4] = [
            &["init", "--quiet"],
            &["remote", "add", "origin", repo],
            &["fetch", "--quiet", "--depth=1", "origin", rev],
            &["checkout", "--quiet", "FETCH_HEAD"],
        ];

        for args in steps {
            let output = self.git(&dir, args).await?;
            if output.success() {
                continue;
            }

            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::debug!(error = %e, dir = %dir.display(), "failed to remove checkout");
            }

            let reason = if output.timed_out {
                format!(
                    "git {} timed out after {}",
                    args[0],
                    humantime::format_duration(self.timeout)
                )
            } else {
                let detail = output.combined_output();
                if detail.trim().is_empty() {
                    format!("git {} exited with {}", args[0], output.exit_code)
                } else {
                    detail.trim().to_string()
                }
            };
            return Ok(Err(reason));
        }

        tokio::fs::write(&marker, format!("{repo}\n{rev}\n"))
            .await
            .map_err(|e| Error::io("mark checkout ready", e))?;

        Ok(Ok(dir))
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput> {
        let options = ExecuteOptions::default()
            .cwd(dir)
            .timeout(self.timeout)
            .env("GIT_TERMINAL_PROMPT", "0");
        self.executor.execute("git", args, options).await
    }

    fn lock_for(&self, dir: &Path) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| Error::Internal {
            message: "checkout lock poisoned".to_string(),
        })?;
        Ok(Arc::clone(locks.entry(dir.to_path_buf()).or_default()))
    }
}

/// Compares declared ids with the ids exported at the checkout.
async fn check_exported(dir: &Path, entry: &RepoEntry) -> Result<Outcome> {
    let path = dir.join(HOOKS_FILE_NAME);
    if !exists(&path).await {
        return Ok(Outcome::HooksFileMissing);
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Error::io("read hooks file", e))?;
    let definitions = match HookDefinition::parse_list(&path, &content) {
        Ok(definitions) => definitions,
        Err(e) => {
            return Ok(Outcome::HooksFileInvalid {
                message: e.to_string(),
            })
        },
    };

    let exported: HashSet<&str> = definitions.iter().map(|d| d.id.as_str()).collect();

    let mut unknown: Vec<String> = Vec::new();
    for hook in &entry.hooks {
        if !exported.contains(hook.id.as_str()) && !unknown.contains(&hook.id) {
            unknown.push(hook.id.clone());
        }
    }

    if unknown.is_empty() {
        Ok(Outcome::Resolved {
            exported: definitions.len(),
        })
    } else {
        Ok(Outcome::UnknownHooks {
            ids: unknown,
            exported: definitions.into_iter().map(|d| d.id).collect(),
        })
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Stable directory name for a `(repo, rev)` pair.
fn cache_key(repo: &str, rev: &str) -> String {
    let digest = Sha256::digest(format!("{repo}\0{rev}").as_bytes());
    digest.iter().take(12).map(|b| format!("{b:02x}")).collect()
}

/// Default fetch concurrency: one per core.
fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::process::Command;
    use tempfile::TempDir;

    const HOOKS_YAML: &str = r#"
- id: black
  name: black
  entry: black
  language: python
- id: black-jupyter
  name: black-jupyter
  entry: black
  language: python
"#;

    fn git(path: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.email=test@test.com", "-c", "user.name=Test"])
            .args(args)
            .current_dir(path)
            .output()
            .expect("run git")
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    /// Creates a hook source repository tagged `v1.0.0`.
    fn create_source(hooks_yaml: Option<&str>) -> (TempDir, String) {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path();
        git(path, &["init", "--quiet"]);
        if let Some(yaml) = hooks_yaml {
            std::fs::write(path.join(HOOKS_FILE_NAME), yaml).expect("write hooks file");
        }
        std::fs::write(path.join("README"), "hooks").expect("write readme");
        git(path, &["add", "."]);
        git(path, &["commit", "--quiet", "-m", "hooks"]);
        git(path, &["tag", "v1.0.0"]);
        let url = format!("file://{}", path.display());
        (temp, url)
    }

    fn manifest(entries: &[(&str, Option<&str>, &[&str])], fail_fast: bool) -> Manifest {
        let mut yaml = format!("fail_fast: {fail_fast}\nrepos:\n");
        for (repo, rev, ids) in entries {
            yaml.push_str(&format!("  - repo: {repo}\n"));
            if let Some(rev) = rev {
                yaml.push_str(&format!("    rev: {rev}\n"));
            }
            yaml.push_str("    hooks:\n");
            for id in *ids {
                yaml.push_str(&format!("      - id: {id}\n"));
                if *repo == "local" {
                    yaml.push_str("        name: n\n        entry: e\n        language: system\n");
                }
            }
        }
        Manifest::parse(&yaml).expect("parse manifest")
    }

    fn resolver(cache: &TempDir) -> Resolver {
        Resolver::new(cache.path(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_resolves_pinned_tag() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(&[(&url, Some("v1.0.0"), &["black"])], true))
            .await
            .expect("resolve");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, Outcome::Resolved { exported: 2 });
    }

    #[tokio::test]
    async fn test_unknown_revision() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(&[(&url, Some("v9.9.9"), &["black"])], false))
            .await
            .expect("resolve");

        assert!(matches!(results[0].outcome, Outcome::RevisionNotFound { .. }));
        assert!(results[0].outcome.is_failure());
        // Failed checkouts are not cached
        assert!(!cache.path().join(cache_key(&url, "v9.9.9")).exists());
    }

    #[tokio::test]
    async fn test_unknown_hook_id() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(
                &[(&url, Some("v1.0.0"), &["black", "blak", "blak"])],
                false,
            ))
            .await
            .expect("resolve");

        assert_eq!(
            results[0].outcome,
            Outcome::UnknownHooks {
                ids: vec!["blak".to_string()],
                exported: vec!["black".to_string(), "black-jupyter".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_missing_hooks_file() {
        let (_source, url) = create_source(None);
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(&[(&url, Some("v1.0.0"), &["black"])], false))
            .await
            .expect("resolve");

        assert_eq!(results[0].outcome, Outcome::HooksFileMissing);
    }

    #[tokio::test]
    async fn test_invalid_hooks_file() {
        let (_source, url) = create_source(Some("- id: [unterminated\n"));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(&[(&url, Some("v1.0.0"), &["black"])], false))
            .await
            .expect("resolve");

        assert!(matches!(results[0].outcome, Outcome::HooksFileInvalid { .. }));
    }

    #[tokio::test]
    async fn test_local_and_missing_rev() {
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(
                &[
                    ("local", None, &["fmt"]),
                    ("https://example.invalid/hooks", None, &["x"]),
                ],
                false,
            ))
            .await
            .expect("resolve");

        assert!(matches!(results[0].outcome, Outcome::Skipped { .. }));
        assert_eq!(results[1].outcome, Outcome::MissingRevision);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_scheduling() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .concurrency(1)
            .resolve(&manifest(
                &[
                    (&url, Some("v9.9.9"), &["black"]),
                    (&url, Some("v1.0.0"), &["black"]),
                    (&url, Some("v1.0.0"), &["black-jupyter"]),
                ],
                true,
            ))
            .await
            .expect("resolve");

        let outcomes: Vec<_> = results.iter().map(|r| r.index).collect();
        assert_eq!(outcomes, [0, 1, 2]);
        assert!(results[0].outcome.is_failure());
        assert_eq!(results[1].outcome, Outcome::NotAttempted);
        assert_eq!(results[2].outcome, Outcome::NotAttempted);
    }

    #[tokio::test]
    async fn test_without_fail_fast_resolves_everything() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .concurrency(1)
            .resolve(&manifest(
                &[
                    (&url, Some("v9.9.9"), &["black"]),
                    (&url, Some("v1.0.0"), &["black"]),
                ],
                false,
            ))
            .await
            .expect("resolve");

        assert!(results[0].outcome.is_failure());
        assert_eq!(results[1].outcome, Outcome::Resolved { exported: 2 });
    }

    #[tokio::test]
    async fn test_checkout_is_cached() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");
        let resolver = resolver(&cache);
        let manifest = manifest(&[(&url, Some("v1.0.0"), &["black"])], false);

        resolver.resolve(&manifest).await.expect("first resolve");
        let marker = cache
            .path()
            .join(cache_key(&url, "v1.0.0"))
            .join(".git")
            .join(READY_MARKER);
        assert!(marker.exists());

        let again = resolver.resolve(&manifest).await.expect("second resolve");
        assert_eq!(again[0].outcome, Outcome::Resolved { exported: 2 });
    }

    #[tokio::test]
    async fn test_local_failure_is_a_hard_error() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let temp = TempDir::new().expect("temp dir");
        let cache = temp.path().join("cache");
        std::fs::write(&cache, "not a directory").expect("write file");

        let result = Resolver::new(&cache, Duration::from_secs(60))
            .concurrency(1)
            .resolve(&manifest(
                &[
                    (&url, Some("v1.0.0"), &["black"]),
                    (&url, Some("main"), &["black"]),
                    (&url, Some("v1.0.0"), &["black-jupyter"]),
                ],
                false,
            ))
            .await;

        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn test_timings_are_recorded() {
        let (_source, url) = create_source(Some(HOOKS_YAML));
        let cache = TempDir::new().expect("cache dir");

        let results = resolver(&cache)
            .resolve(&manifest(
                &[(&url, Some("v1.0.0"), &["black"]), ("local", None, &["x"])],
                false,
            ))
            .await
            .expect("resolve");

        assert!(results[0].duration > Duration::ZERO);
        assert_eq!(results[1].index, 1);
    }

    #[test]
    fn test_default_concurrency() {
        assert!(default_concurrency() >= 1);
    }

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        assert_eq!(cache_key("a", "v1"), cache_key("a", "v1"));
        assert_ne!(cache_key("a", "v1"), cache_key("a", "v2"));
        assert_eq!(cache_key("a", "v1").len(), 24);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = Outcome::UnknownHooks {
            ids: vec!["blak".to_string()],
            exported: vec!["black".to_string()],
        };
        assert_eq!(
            outcome.to_string(),
            "unknown hook id(s) blak (exported: black)"
        );
        assert!(!Outcome::NotAttempted.is_failure());
    }
}
