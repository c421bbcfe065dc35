//! Git history retrieval.
//!
//! Enumerates commits with git2 and retrieves the raw diff, metadata and
//! blame text the parsers consume by invoking the `git` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDate;
use git2::{Repository, Sort};
use jitmine_core::{JitError, MiningConfig};

use crate::extract::CHANGE_FILES_MARKER;

/// Which commits to enumerate.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.branch.is_none());
/// assert!(opts.since.is_none() && opts.until.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Only include commits on or after this day (UTC).
    pub since: Option<NaiveDate>,
    /// Only include commits on or before this day (UTC).
    pub until: Option<NaiveDate>,
}

impl From<&MiningConfig> for MiningOptions {
    fn from(config: &MiningConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            since: config.since,
            until: config.until,
        }
    }
}

impl MiningOptions {
    /// Whether a commit timestamp falls inside the configured window.
    pub fn contains(&self, timestamp: i64) -> bool {
        let lower = self.since.map(day_start);
        let upper = self.until.and_then(|d| d.succ_opt()).map(day_start);
        lower.map_or(true, |l| timestamp >= l) && upper.map_or(true, |u| timestamp < u)
    }
}

fn day_start(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Provider of the raw text the extraction pipeline consumes.
pub trait HistorySource {
    /// Ids of the non-merge commits to process, in non-decreasing commit-date order.
    fn commit_ids(&self, options: &MiningOptions) -> Result<Vec<String>, JitError>;

    /// Metadata listing of a commit, terminated by the change-files marker.
    fn show_metadata(&self, id: &str) -> Result<String, JitError>;

    /// Full-context unified diff of a commit against its first parent.
    fn show_diff(&self, id: &str) -> Result<String, JitError>;

    /// Blame listing of `path` at revision `rev`.
    fn blame(&self, rev: &str, path: &str) -> Result<String, JitError>;
}

/// A [`HistorySource`] backed by a local git repository.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use jitmine_gitpulse::mining::{GitSource, HistorySource, MiningOptions};
///
/// let source = GitSource::open(Path::new(".")).unwrap();
/// let ids = source.commit_ids(&MiningOptions::default()).unwrap();
/// println!("{} commits", ids.len());
/// ```
pub struct GitSource {
    repo_path: PathBuf,
    repo: Repository,
}

impl GitSource {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::Git`] if `path` is not inside a git repository.
    pub fn open(path: &Path) -> Result<Self, JitError> {
        let repo = Repository::open(path)
            .map_err(|e| JitError::Git(format!("failed to open repository: {e}")))?;
        let repo_path = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self { repo_path, repo })
    }

    /// Root directory git commands run in.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn run_git(&self, args: &[&str]) -> Result<String, JitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(args)
            .output()?;

        if !output.status.success() {
            tracing::debug!(
                command = %args.join(" "),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git exited with failure"
            );
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl HistorySource for GitSource {
    fn commit_ids(&self, options: &MiningOptions) -> Result<Vec<String>, JitError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| JitError::Git(format!("failed to create revwalk: {e}")))?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(|e| JitError::Git(format!("failed to set revwalk order: {e}")))?;

        if let Some(ref branch) = options.branch {
            let reference = self
                .repo
                .resolve_reference_from_short_name(branch)
                .map_err(|e| JitError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
            let oid = reference
                .target()
                .ok_or_else(|| JitError::Git("branch has no target".into()))?;
            revwalk
                .push(oid)
                .map_err(|e| JitError::Git(format!("failed to push oid: {e}")))?;
        } else {
            revwalk
                .push_head()
                .map_err(|e| JitError::Git(format!("failed to push HEAD: {e}")))?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(|e| JitError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| JitError::Git(format!("failed to find commit: {e}")))?;

            if commit.parent_count() > 1 {
                continue;
            }
            let timestamp = commit.time().seconds();
            if options.contains(timestamp) {
                commits.push((timestamp, oid.to_string()));
            }
        }

        // stable: topological order breaks ties
        commits.sort_by_key(|(timestamp, _)| *timestamp);
        tracing::debug!(commits = commits.len(), "enumerated commits");
        Ok(commits.into_iter().map(|(_, id)| id).collect())
    }

    fn show_metadata(&self, id: &str) -> Result<String, JitError> {
        let pretty = format!("--pretty=format:%H%n%P%n%an%n%ct%n%s%n%B%n{CHANGE_FILES_MARKER}");
        self.run_git(&["show", id, "--name-only", &pretty])
    }

    fn show_diff(&self, id: &str) -> Result<String, JitError> {
        self.run_git(&["show", id, "--pretty=format:", "--unified=999999999"])
    }

    fn blame(&self, rev: &str, path: &str) -> Result<String, JitError> {
        self.run_git(&["blame", "-t", "-n", "-l", rev, "--", path])
    }
}
