//! Cross-commit history state.
//!
//! Holds per-file author sets and touch counts plus per-author touch
//! timestamps. Every processed commit reads and extends this state, so it
//! is only meaningful when commits are folded in non-decreasing date order;
//! [`HistoryStore::ensure_in_order`] enforces that.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use jitmine_core::JitError;
use serde::{Deserialize, Serialize};

/// Accumulated state of one file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// Every author that has touched the file.
    pub authors: BTreeSet<String>,
    /// Number of commits that touched the file.
    pub nuc: u64,
}

/// Timestamps of one author's touches of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTouches {
    /// File path.
    pub path: String,
    /// Commit timestamps in the order they were recorded.
    pub times: Vec<i64>,
}

/// Everything an author has touched, in first-touch order.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::history::HistoryStore;
///
/// let mut store = HistoryStore::new();
/// store.touch("b.rs", "alice", 10);
/// store.touch("a.rs", "alice", 20);
/// let exp = store.prior_author_experience("alice").unwrap();
/// let order: Vec<_> = exp.files().iter().map(|f| f.path.as_str()).collect();
/// assert_eq!(order, vec!["b.rs", "a.rs"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorExperience {
    files: Vec<FileTouches>,
}

impl AuthorExperience {
    /// Touched files in the order the author first touched them.
    pub fn files(&self) -> &[FileTouches] {
        &self.files
    }

    /// Recorded timestamps for `path`, if the author ever touched it.
    pub fn times(&self, path: &str) -> Option<&[i64]> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.times.as_slice())
    }

    fn record(&mut self, path: &str, time: i64) {
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(entry) => entry.times.push(time),
            None => self.files.push(FileTouches {
                path: path.to_string(),
                times: vec![time],
            }),
        }
    }
}

/// Append-only store of history-derived state for one processing run.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::history::HistoryStore;
///
/// let mut store = HistoryStore::new();
/// assert_eq!(store.touch("src/lib.rs", "alice", 100), 1);
/// assert_eq!(store.touch("src/lib.rs", "bob", 200), 2);
/// assert_eq!(store.file_authors("src/lib.rs").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStore {
    files: BTreeMap<String, FileState>,
    authors: BTreeMap<String, AuthorExperience>,
    last_date: Option<i64>,
    last_commit: Option<String>,
    folded: u64,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `author` touched `path` at `timestamp`.
    ///
    /// Returns the file's touch count after this touch.
    pub fn touch(&mut self, path: &str, author: &str, timestamp: i64) -> u64 {
        let state = self.files.entry(path.to_string()).or_default();
        state.authors.insert(author.to_string());
        state.nuc += 1;
        let nuc = state.nuc;

        self.authors
            .entry(author.to_string())
            .or_default()
            .record(path, timestamp);
        nuc
    }

    /// Touch history of `author`, `None` if the author was never seen.
    pub fn prior_author_experience(&self, author: &str) -> Option<&AuthorExperience> {
        self.authors.get(author)
    }

    /// Authors that have touched `path`.
    pub fn file_authors(&self, path: &str) -> Option<&BTreeSet<String>> {
        self.files.get(path).map(|s| &s.authors)
    }

    /// State of `path`, if it was ever touched.
    pub fn file(&self, path: &str) -> Option<&FileState> {
        self.files.get(path)
    }

    /// Date of the last folded commit.
    pub fn last_date(&self) -> Option<i64> {
        self.last_date
    }

    /// Id of the last folded commit.
    pub fn last_commit(&self) -> Option<&str> {
        self.last_commit.as_deref()
    }

    /// The part of an ordered id list that comes after the last folded commit.
    ///
    /// Returns all of `ids` when nothing was folded or the last folded
    /// commit is not in the list.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_gitpulse::history::HistoryStore;
    ///
    /// let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    /// let mut store = HistoryStore::new();
    /// assert_eq!(store.remaining(&ids).len(), 3);
    /// store.advance("b", 10);
    /// assert_eq!(store.remaining(&ids), &ids[2..]);
    /// ```
    pub fn remaining<'a>(&self, ids: &'a [String]) -> &'a [String] {
        self.last_commit
            .as_deref()
            .and_then(|last| ids.iter().position(|id| id == last))
            .map_or(ids, |pos| &ids[pos + 1..])
    }

    /// Number of commits folded so far.
    pub fn commits_folded(&self) -> u64 {
        self.folded
    }

    /// Reject a commit that is older than the last folded one.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::Sequencing`] if `date` precedes the last folded date.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_gitpulse::history::HistoryStore;
    ///
    /// let mut store = HistoryStore::new();
    /// store.advance("first", 200);
    /// assert!(store.ensure_in_order("later", 200).is_ok());
    /// assert!(store.ensure_in_order("earlier", 100).is_err());
    /// ```
    pub fn ensure_in_order(&self, id: &str, date: i64) -> Result<(), JitError> {
        match self.last_date {
            Some(last) if date < last => Err(JitError::Sequencing {
                id: id.to_string(),
                date,
                last,
            }),
            _ => Ok(()),
        }
    }

    /// Mark commit `id` dated `date` as folded.
    pub fn advance(&mut self, id: &str, date: i64) {
        self.last_date = Some(self.last_date.map_or(date, |last| last.max(date)));
        self.last_commit = Some(id.to_string());
        self.folded += 1;
    }

    /// Load a checkpoint written by [`HistoryStore::save`].
    ///
    /// Returns `Ok(None)` if no checkpoint exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::Io`] or [`JitError::Serialization`] when the
    /// checkpoint exists but cannot be read.
    pub fn load(path: &Path) -> Result<Option<Self>, JitError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let store = serde_json::from_str(&content)?;
        Ok(Some(store))
    }

    /// Write the store as a JSON checkpoint, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), JitError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
