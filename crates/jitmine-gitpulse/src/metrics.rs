//! Just-in-time commit metrics.
//!
//! Folds one commit's filtered file diffs and blame into a
//! [`CommitFeature`], reading and extending the [`HistoryStore`].

use std::collections::BTreeSet;

use jitmine_core::{CommitFeature, JitError};

use crate::blame::{latest_time, FileBlame};
use crate::extract::CommitRecord;
use crate::history::{AuthorExperience, HistoryStore};

const SECONDS_PER_DAY: f64 = 86_400.0;

const FIX_KEYWORDS: &[&str] = &["fix", "bug", "issue"];
const NOT_FIX_KEYWORDS: &[&str] = &["fix typo", "fix build", "non-fix"];

/// Subsystem, directory and file name of a repository path.
///
/// Top-level files belong to the `"root"` subsystem and directory.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::metrics::split_path;
///
/// assert_eq!(split_path("src/net/http.rs"), ("src", "src/net", "http.rs"));
/// assert_eq!(split_path("README.md"), ("root", "root", "README.md"));
/// ```
pub fn split_path(path: &str) -> (&str, &str, &str) {
    match path.rfind('/') {
        Some(last) => {
            let subsystem = path.split('/').next().unwrap_or(path);
            (subsystem, &path[..last], &path[last + 1..])
        }
        None => ("root", "root", path),
    }
}

/// Whether a commit message looks like a bug fix.
///
/// Matching is on literal, case-sensitive substrings.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::metrics::is_bug_fix;
///
/// assert!(is_bug_fix("Fix null pointer bug"));
/// assert!(!is_bug_fix("Fix typo in README"));
/// assert!(!is_bug_fix("add feature"));
/// ```
pub fn is_bug_fix(message: &str) -> bool {
    FIX_KEYWORDS.iter().any(|k| message.contains(k))
        && !NOT_FIX_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Shannon entropy (base 2) of modified lines across files.
///
/// `modified` holds the running total after each file; the total is its
/// last element. Zero entries are ignored.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::metrics::entropy;
///
/// assert_eq!(entropy(&[12]), 0.0);
/// assert_eq!(entropy(&[]), 0.0);
/// ```
pub fn entropy(modified: &[u64]) -> f64 {
    let total = modified.last().copied().unwrap_or(0);
    if total == 0 {
        return 0.0;
    }
    modified
        .iter()
        .filter(|&&m| m != 0)
        .map(|&m| {
            let p = m as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Seconds between `commit_date` and the latest attribution in `blame`.
///
/// Files without blame data, or with a zero attribution time, have age 0.
pub fn file_age(commit_date: i64, blame: &FileBlame) -> i64 {
    match latest_time(blame) {
        Some(prev) if prev != 0 => (commit_date - prev).max(0),
        _ => 0,
    }
}

/// Touches recorded for an author, skipping the first file they touched.
pub fn author_exp(experience: &AuthorExperience) -> u64 {
    experience
        .files()
        .iter()
        .skip(1)
        .map(|f| f.times.len() as u64)
        .sum()
}

/// Recency-weighted touches, skipping the first file the author touched.
///
/// Each touch weighs `1 / (age_in_days + 1)` relative to `now`.
pub fn author_rexp(experience: &AuthorExperience, now: i64) -> f64 {
    experience
        .files()
        .iter()
        .skip(1)
        .flat_map(|f| f.times.iter())
        .map(|&t| {
            let age = ((now - t) as f64 / SECONDS_PER_DAY).max(0.0);
            1.0 / (age + 1.0)
        })
        .sum()
}

/// Files the author touched whose subsystem is in `subsystems`.
pub fn author_sexp(experience: &AuthorExperience, subsystems: &BTreeSet<&str>) -> u64 {
    experience
        .files()
        .iter()
        .filter(|f| subsystems.contains(split_path(&f.path).0))
        .count() as u64
}

/// Compute the feature record of `commit` and fold it into `history`.
///
/// Files are visited in the record's order. Line counts and the modified
/// line totals feeding entropy are running sums over that order.
///
/// # Errors
///
/// Returns [`JitError::Sequencing`] without touching `history` when the
/// commit is older than the last folded commit.
///
/// # Examples
///
/// ```
/// use jitmine_core::CommitMeta;
/// use jitmine_gitpulse::extract::CommitRecord;
/// use jitmine_gitpulse::history::HistoryStore;
/// use jitmine_gitpulse::metrics::extract_features;
///
/// let record = CommitRecord {
///     meta: CommitMeta {
///         id: "c1".into(),
///         parent: None,
///         author: "alice".into(),
///         date: 1_000,
///         subject: "fix crash".into(),
///         message: "fix crash".into(),
///     },
///     files: vec![],
/// };
/// let mut history = HistoryStore::new();
/// let feature = extract_features(&record, &mut history).unwrap();
/// assert_eq!(feature.fix, 1);
/// assert_eq!(history.last_date(), Some(1_000));
/// ```
pub fn extract_features(
    commit: &CommitRecord,
    history: &mut HistoryStore,
) -> Result<CommitFeature, JitError> {
    let meta = &commit.meta;
    history.ensure_in_order(&meta.id, meta.date)?;

    let mut subsystems = BTreeSet::new();
    let mut directories = BTreeSet::new();
    let mut names = BTreeSet::new();
    let mut authors: BTreeSet<String> = BTreeSet::new();
    let (mut la, mut ld, mut lt, mut nuc) = (0u64, 0u64, 0u64, 0u64);
    let mut total_modified = 0u64;
    let mut modified_per_file = Vec::with_capacity(commit.files.len());
    let mut age_sum = 0i64;

    for file in &commit.files {
        let (subsystem, directory, name) = split_path(&file.path);
        subsystems.insert(subsystem);
        directories.insert(directory);
        names.insert(name);

        la += file.diff.added_count();
        ld += file.diff.removed_count();
        lt += file.diff.original_lines();
        total_modified += la + ld;
        modified_per_file.push(total_modified);

        nuc += history.touch(&file.path, &meta.author, meta.date);
        if let Some(file_authors) = history.file_authors(&file.path) {
            authors.extend(file_authors.iter().cloned());
        }

        age_sum += file_age(meta.date, &file.blame);
    }
    history.advance(&meta.id, meta.date);

    let age = if commit.files.is_empty() {
        0.0
    } else {
        age_sum as f64 / commit.files.len() as f64 / SECONDS_PER_DAY
    };

    let (exp, rexp, sexp) = match history.prior_author_experience(&meta.author) {
        Some(experience) => (
            author_exp(experience),
            author_rexp(experience, meta.date),
            author_sexp(experience, &subsystems),
        ),
        None => (0, 0.0, 0),
    };

    Ok(CommitFeature {
        id: meta.id.clone(),
        date: meta.date,
        ns: subsystems.len() as u64,
        nd: directories.len() as u64,
        nf: names.len() as u64,
        entropy: entropy(&modified_per_file),
        la,
        ld,
        lt,
        fix: u8::from(is_bug_fix(&meta.message)),
        ndev: authors.len() as u64,
        age,
        nuc,
        exp,
        rexp,
        sexp,
    })
}
