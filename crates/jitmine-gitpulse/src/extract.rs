//! Commit-level extraction with failure isolation.
//!
//! Retrieves a commit's metadata, diff and blame through a
//! [`HistorySource`], keeps the files that can be analysed, and folds the
//! result into the history. A malformed file drops only that file; a
//! malformed commit is tallied as failed; an out-of-order commit stops the
//! run.

use std::collections::BTreeMap;

use jitmine_core::{CommitFeature, CommitMeta, ExtractConfig, JitError};
use jitmine_difflens::aggregate::FileDiff;
use jitmine_difflens::filter::{DiffFilter, SkipReason, SkippedFile};
use jitmine_difflens::parse_commit_diff;
use serde::{Deserialize, Serialize};

use crate::blame::{parse_blame, FileBlame};
use crate::history::HistoryStore;
use crate::metrics::{extract_features, is_bug_fix};
use crate::mining::HistorySource;

/// Marker line that ends the message section of the metadata listing.
pub const CHANGE_FILES_MARKER: &str = "[ALL CHANGE FILES]";

/// Parse the output of
/// `git show <id> --name-only --pretty=format:%H%n%P%n%an%n%ct%n%s%n%B%n[ALL CHANGE FILES]`.
///
/// # Errors
///
/// Returns [`JitError::Parse`] when the marker is missing, the header is
/// short, or the timestamp is not numeric.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::extract::parse_commit_meta;
///
/// let text = "abc123\nparent1 parent2\nAlice\n1700000000\nFix bug\nFix bug\n\nDetails here\n[ALL CHANGE FILES]\nsrc/a.rs\n";
/// let meta = parse_commit_meta(text).unwrap();
/// assert_eq!(meta.parent.as_deref(), Some("parent1"));
/// assert_eq!(meta.message, "Fix bug  Details here");
/// ```
pub fn parse_commit_meta(text: &str) -> Result<CommitMeta, JitError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let marker = lines
        .iter()
        .position(|l| *l == CHANGE_FILES_MARKER)
        .ok_or_else(|| JitError::Parse(format!("commit metadata lacks {CHANGE_FILES_MARKER}")))?;
    if marker < 5 {
        return Err(JitError::Parse(format!(
            "commit metadata header has {marker} lines, expected at least 5"
        )));
    }

    let date = lines[3]
        .parse::<i64>()
        .map_err(|e| JitError::Parse(format!("invalid commit timestamp {:?}: {e}", lines[3])))?;

    Ok(CommitMeta {
        id: lines[0].to_string(),
        parent: lines[1].split_whitespace().next().map(str::to_string),
        author: lines[2].to_string(),
        date,
        subject: lines[4].to_string(),
        message: lines[5..marker].join(" "),
    })
}

/// One analysed file of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    /// Path after the change.
    pub path: String,
    /// Aggregated diff.
    pub diff: FileDiff,
    /// Blame of the file before the change.
    pub blame: FileBlame,
}

/// A commit's metadata plus its analysable files, in diff order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit metadata.
    pub meta: CommitMeta,
    /// Files kept after filtering.
    pub files: Vec<CommitFile>,
}

impl CommitRecord {
    fn insert(&mut self, file: CommitFile) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }
}

/// A commit record together with what was left out of it.
#[derive(Debug)]
pub struct ExtractedCommit {
    /// The record passed on to feature extraction.
    pub record: CommitRecord,
    /// Files excluded by policy.
    pub skipped: Vec<SkippedFile>,
    /// Files whose diff failed to parse.
    pub dropped: Vec<(usize, JitError)>,
}

/// Final state of a commit in an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    /// Features were computed.
    Extracted,
    /// No analysable file remained after filtering.
    NotApplicable,
    /// Metadata or retrieval failed.
    Failed,
}

/// Tally of an extraction run.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::extract::{CommitStatus, ExtractionReport};
///
/// let mut report = ExtractionReport::default();
/// report.record("a", CommitStatus::Extracted);
/// report.record("b", CommitStatus::Failed);
/// assert_eq!(report.total(), 2);
/// assert_eq!(report.failed, vec!["b"]);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Commits with computed features.
    pub extracted: usize,
    /// Commits with nothing left to analyse.
    pub not_applicable: usize,
    /// Ids of commits that failed.
    pub failed: Vec<String>,
    /// Skipped files per reason kind.
    pub skipped_files: BTreeMap<String, usize>,
    /// Files dropped because their diff did not parse.
    pub dropped_files: usize,
    /// Commits whose message looks like a bug fix.
    pub fix_candidates: Vec<String>,
}

impl ExtractionReport {
    /// Count a commit under `status`.
    pub fn record(&mut self, id: &str, status: CommitStatus) {
        match status {
            CommitStatus::Extracted => self.extracted += 1,
            CommitStatus::NotApplicable => self.not_applicable += 1,
            CommitStatus::Failed => self.failed.push(id.to_string()),
        }
    }

    /// Count an excluded file.
    pub fn record_skip(&mut self, reason: &SkipReason) {
        *self
            .skipped_files
            .entry(reason.kind().to_string())
            .or_insert(0) += 1;
    }

    /// Number of commits seen.
    pub fn total(&self) -> usize {
        self.extracted + self.not_applicable + self.failed.len()
    }
}

/// Runs extraction against a history source.
pub struct Extractor<'a, S: HistorySource + ?Sized> {
    source: &'a S,
    filter: DiffFilter,
}

impl<'a, S: HistorySource + ?Sized> Extractor<'a, S> {
    /// Create an extractor applying `config`'s filtering policy.
    pub fn new(source: &'a S, config: &ExtractConfig) -> Self {
        Self {
            source,
            filter: DiffFilter::from_config(config),
        }
    }

    /// Retrieve and assemble the record of commit `id`.
    ///
    /// # Errors
    ///
    /// Returns an error when metadata or diff retrieval fails or the
    /// metadata does not parse. Per-file failures are reported in the
    /// result instead.
    pub fn extract_commit(&self, id: &str) -> Result<ExtractedCommit, JitError> {
        let meta = parse_commit_meta(&self.source.show_metadata(id)?)?;
        let diff_text = self.source.show_diff(id)?;

        let mut extracted = ExtractedCommit {
            record: CommitRecord {
                meta,
                files: Vec::new(),
            },
            skipped: Vec::new(),
            dropped: Vec::new(),
        };

        for (index, result) in parse_commit_diff(&diff_text).into_iter().enumerate() {
            let diff = match result {
                Ok(diff) => diff,
                Err(e) => {
                    tracing::warn!(commit = id, block = index, error = %e, "dropping unparsable file diff");
                    extracted.dropped.push((index, e));
                    continue;
                }
            };
            let path = diff.name_b().unwrap_or_default().to_string();
            if let Some(reason) = self.filter.check(&diff) {
                tracing::debug!(commit = id, file = %path, %reason, "skipping file");
                extracted.skipped.push(SkippedFile { path, reason });
                continue;
            }

            let blame = match (&extracted.record.meta.parent, diff.name_a()) {
                (Some(parent), Some(target)) => parse_blame(
                    &self
                        .source
                        .blame(parent, target)?
                        .lines()
                        .collect::<Vec<_>>(),
                ),
                _ => FileBlame::new(),
            };
            if blame.is_empty() {
                tracing::debug!(commit = id, file = %path, "skipping file without blame");
                extracted.skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::NoBlameData,
                });
                continue;
            }

            extracted.record.insert(CommitFile { path, diff, blame });
        }

        Ok(extracted)
    }

    /// Extract commit `id` and fold it into `history`.
    ///
    /// Returns the feature record, or `None` when the commit failed or had
    /// nothing to analyse; either outcome is tallied in `report`.
    ///
    /// # Errors
    ///
    /// Only [`JitError::Sequencing`] is returned; it aborts the run.
    pub fn process(
        &self,
        id: &str,
        history: &mut HistoryStore,
        report: &mut ExtractionReport,
    ) -> Result<Option<CommitFeature>, JitError> {
        let extracted = match self.extract_commit(id) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(commit = id, error = %e, "commit failed");
                report.record(id, CommitStatus::Failed);
                return Ok(None);
            }
        };

        for skipped in &extracted.skipped {
            report.record_skip(&skipped.reason);
        }
        report.dropped_files += extracted.dropped.len();

        let record = extracted.record;
        if record.files.is_empty() {
            report.record(id, CommitStatus::NotApplicable);
            return Ok(None);
        }
        if is_bug_fix(&record.meta.message) {
            report.fix_candidates.push(id.to_string());
        }

        let feature = extract_features(&record, history)?;
        report.record(id, CommitStatus::Extracted);
        Ok(Some(feature))
    }

    /// Process `ids` in order, passing each feature record to `emit`.
    ///
    /// # Errors
    ///
    /// Stops at the first [`JitError::Sequencing`] or `emit` error.
    pub fn run<I, F>(
        &self,
        ids: I,
        history: &mut HistoryStore,
        mut emit: F,
    ) -> Result<ExtractionReport, JitError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: FnMut(CommitFeature) -> Result<(), JitError>,
    {
        let mut report = ExtractionReport::default();
        for id in ids {
            if let Some(feature) = self.process(id.as_ref(), history, &mut report)? {
                emit(feature)?;
            }
        }
        tracing::info!(
            extracted = report.extracted,
            not_applicable = report.not_applicable,
            failed = report.failed.len(),
            "extraction finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::MiningOptions;
    use jitmine_core::is_sorted_by_date;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        metadata: HashMap<String, String>,
        diffs: HashMap<String, String>,
        blames: HashMap<(String, String), String>,
    }

    impl FakeSource {
        fn commit(mut self, id: &str, parent: &str, date: i64, message: &str, diff: &str) -> Self {
            self.metadata.insert(
                id.into(),
                format!("{id}\n{parent}\ndev\n{date}\n{message}\n{message}\n{CHANGE_FILES_MARKER}\n"),
            );
            self.diffs.insert(id.into(), diff.into());
            self
        }

        fn blame(mut self, rev: &str, path: &str, text: &str) -> Self {
            self.blames.insert((rev.into(), path.into()), text.into());
            self
        }
    }

    impl HistorySource for FakeSource {
        fn commit_ids(&self, _options: &MiningOptions) -> Result<Vec<String>, JitError> {
            let mut ids: Vec<_> = self.metadata.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        }

        fn show_metadata(&self, id: &str) -> Result<String, JitError> {
            self.metadata
                .get(id)
                .cloned()
                .ok_or_else(|| JitError::Git(format!("unknown commit {id}")))
        }

        fn show_diff(&self, id: &str) -> Result<String, JitError> {
            Ok(self.diffs.get(id).cloned().unwrap_or_default())
        }

        fn blame(&self, rev: &str, path: &str) -> Result<String, JitError> {
            Ok(self
                .blames
                .get(&(rev.to_string(), path.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn modify(path: &str) -> String {
        format!(
            "diff --git a/{path} b/{path}\n\
             index 1111111..2222222 100644\n\
             --- a/{path}\n\
             +++ b/{path}\n\
             @@ -1,2 +1,2 @@\n \
             keep\n\
             -old\n\
             +new\n"
        )
    }

    const BLAME: &str = "aaaa 1 (dev 100 +0000 1) keep\naaaa 2 (dev 100 +0000 2) old\n";

    #[test]
    fn metadata_requires_marker() {
        let err = parse_commit_meta("a\nb\nc\n1\nsubject\n").unwrap_err();
        assert!(matches!(err, JitError::Parse(_)));
    }

    #[test]
    fn metadata_rejects_bad_timestamp() {
        let err = parse_commit_meta(&format!("a\n\nc\nsoon\ns\n{CHANGE_FILES_MARKER}\n")).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn root_commit_has_no_parent() {
        let meta = parse_commit_meta(&format!("  a  \n\nAlice\n5\nInit\nInit\n{CHANGE_FILES_MARKER}\nx\n")).unwrap();
        assert_eq!(meta.id, "a");
        assert_eq!(meta.parent, None);
        assert_eq!(meta.date, 5);
        assert_eq!(meta.message, "Init");
    }

    #[test]
    fn files_without_blame_are_skipped() {
        let diff = format!("{}{}", modify("a.py"), modify("b.py"));
        let source = FakeSource::default()
            .commit("c1", "p0", 200, "change", &diff)
            .blame("p0", "a.py", BLAME);
        let extractor = Extractor::new(&source, &ExtractConfig::default());
        let extracted = extractor.extract_commit("c1").unwrap();
        assert_eq!(extracted.record.files.len(), 1);
        assert_eq!(extracted.record.files[0].path, "a.py");
        assert_eq!(extracted.skipped[0].reason, SkipReason::NoBlameData);
    }

    #[test]
    fn malformed_file_is_dropped_but_commit_survives() {
        let diff = format!("{}diff --git a/z.py b/z.py\nnonsense\n", modify("a.py"));
        let source = FakeSource::default()
            .commit("c1", "p0", 200, "change", &diff)
            .blame("p0", "a.py", BLAME);
        let extractor = Extractor::new(&source, &ExtractConfig::default());
        let mut history = HistoryStore::new();
        let mut report = ExtractionReport::default();
        let feature = extractor
            .process("c1", &mut history, &mut report)
            .unwrap()
            .unwrap();
        assert_eq!(feature.la, 1);
        assert_eq!(report.dropped_files, 1);
        assert_eq!(report.extracted, 1);
    }

    #[test]
    fn run_tallies_every_status() {
        let source = FakeSource::default()
            .commit("c1", "p0", 100, "fix issue", &modify("a.py"))
            .commit("c2", "c1", 200, "docs", "")
            .blame("p0", "a.py", BLAME);
        let extractor = Extractor::new(&source, &ExtractConfig::default());
        let mut history = HistoryStore::new();
        let mut features = Vec::new();
        let report = extractor
            .run(["c1", "c2", "missing"], &mut history, |f| {
                features.push(f);
                Ok(())
            })
            .unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(report.extracted, 1);
        assert_eq!(report.not_applicable, 1);
        assert_eq!(report.failed, vec!["missing"]);
        assert_eq!(report.fix_candidates, vec!["c1"]);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn run_emits_features_in_date_order() {
        let source = FakeSource::default()
            .commit("c9", "p0", 100, "first", &modify("a.py"))
            .commit("c1", "c9", 200, "second", &modify("a.py"))
            .commit("c5", "c1", 300, "third", &modify("a.py"))
            .commit("c3", "c5", 300, "fourth", &modify("a.py"))
            .blame("p0", "a.py", BLAME)
            .blame("c9", "a.py", BLAME)
            .blame("c1", "a.py", BLAME)
            .blame("c5", "a.py", BLAME);
        let extractor = Extractor::new(&source, &ExtractConfig::default());
        let mut history = HistoryStore::new();
        let mut features = Vec::new();
        extractor
            .run(["c9", "c1", "c5", "c3"], &mut history, |f| {
                features.push(f);
                Ok(())
            })
            .unwrap();

        let ids: Vec<_> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c9", "c1", "c5", "c3"]);
        assert!(is_sorted_by_date(&features));
        assert_eq!(features[3].nuc, 4);
    }

    #[test]
    fn out_of_order_commits_abort_the_run() {
        let source = FakeSource::default()
            .commit("late", "p0", 500, "x", &modify("a.py"))
            .commit("early", "p0", 100, "y", &modify("a.py"))
            .blame("p0", "a.py", BLAME);
        let extractor = Extractor::new(&source, &ExtractConfig::default());
        let mut history = HistoryStore::new();
        let err = extractor
            .run(["late", "early"], &mut history, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, JitError::Sequencing { .. }));
        assert_eq!(history.commits_folded(), 1);
    }

    #[test]
    fn language_allow_list_makes_commit_not_applicable() {
        let source = FakeSource::default()
            .commit("c1", "p0", 100, "x", &modify("a.py"))
            .blame("p0", "a.py", BLAME);
        let config = ExtractConfig {
            languages: vec!["Rust".into()],
            ..ExtractConfig::default()
        };
        let extractor = Extractor::new(&source, &config);
        let mut history = HistoryStore::new();
        let mut report = ExtractionReport::default();
        assert!(extractor
            .process("c1", &mut history, &mut report)
            .unwrap()
            .is_none());
        assert_eq!(report.not_applicable, 1);
        assert_eq!(report.skipped_files.get("language"), Some(&1));
        assert_eq!(history.commits_folded(), 0);
    }
}
