//! Caller-side file filtering applied after aggregation.
//!
//! Drops binary files, files without content, files that did not exist
//! before the commit (nothing to blame), files outside the configured
//! language allow-list, and files matching custom skip patterns.

use std::fmt;
use std::path::Path;

use jitmine_core::ExtractConfig;
use serde::Serialize;

use crate::aggregate::FileDiff;

/// Known source extensions and the language they map to.
const LANGUAGES: &[(&str, &str)] = &[
    ("py", "Python"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("c", "C"),
    ("js", "JavaScript"),
    ("rb", "Ruby"),
    ("swift", "Swift"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("ts", "TypeScript"),
    ("php", "PHP"),
];

/// Language of a path by its extension, matched case-insensitively.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::filter::language_of;
///
/// assert_eq!(language_of("src/main.rs"), Some("Rust"));
/// assert_eq!(language_of("lib/Util.CC"), Some("C++"));
/// assert_eq!(language_of("README.md"), None);
/// ```
pub fn language_of(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?;
    LANGUAGES
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, lang)| *lang)
}

/// Decides which aggregated file diffs take part in a commit.
///
/// # Examples
///
/// ```
/// use jitmine_core::ExtractConfig;
/// use jitmine_difflens::filter::DiffFilter;
///
/// let config = ExtractConfig { languages: vec!["Rust".into()], ..ExtractConfig::default() };
/// let filter = DiffFilter::from_config(&config);
/// assert!(filter.allows_path("src/lib.rs"));
/// assert!(!filter.allows_path("app.py"));
/// ```
#[derive(Debug, Default)]
pub struct DiffFilter {
    languages: Vec<String>,
    skip_patterns: Vec<glob::Pattern>,
}

impl DiffFilter {
    /// A filter with no language allow-list and no custom patterns.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Create a filter from extraction configuration.
    ///
    /// Patterns that are not valid globs are ignored.
    pub fn from_config(config: &ExtractConfig) -> Self {
        let skip_patterns = config
            .skip_patterns
            .iter()
            .filter_map(|pat| glob::Pattern::new(pat).ok())
            .collect();

        Self {
            languages: config.languages.clone(),
            skip_patterns,
        }
    }

    /// Whether a path passes the language allow-list and skip patterns.
    pub fn allows_path(&self, path: &str) -> bool {
        self.check_path(path).is_none()
    }

    /// Why `diff` should be excluded, or `None` if it is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_difflens::aggregate::FileDiff;
    /// use jitmine_difflens::filter::{DiffFilter, SkipReason};
    ///
    /// let diff = FileDiff { is_binary: true, ..FileDiff::default() };
    /// assert_eq!(DiffFilter::allow_all().check(&diff), Some(SkipReason::Binary));
    /// ```
    pub fn check(&self, diff: &FileDiff) -> Option<SkipReason> {
        if diff.is_binary {
            return Some(SkipReason::Binary);
        }
        if diff.content.is_empty() {
            return Some(SkipReason::EmptyContent);
        }
        if diff.from.is_absent() {
            return Some(SkipReason::NoBlameTarget);
        }
        self.check_path(diff.name_b().unwrap_or_default())
    }

    /// Split `diffs` into kept files and skipped files with reasons.
    pub fn filter(&self, diffs: Vec<FileDiff>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for diff in diffs {
            match self.check(&diff) {
                Some(reason) => skipped.push(SkippedFile {
                    path: diff.name_b().unwrap_or_default().to_string(),
                    reason,
                }),
                None => kept.push(diff),
            }
        }

        FilterResult { kept, skipped }
    }

    fn check_path(&self, path: &str) -> Option<SkipReason> {
        if !self.languages.is_empty() {
            let lang = language_of(path);
            if !lang.is_some_and(|l| self.languages.iter().any(|a| a.eq_ignore_ascii_case(l))) {
                return Some(SkipReason::Language(lang.unwrap_or("unknown").to_string()));
            }
        }
        self.skip_patterns
            .iter()
            .find(|pat| pat.matches(path))
            .map(|pat| SkipReason::PatternMatch(pat.to_string()))
    }
}

/// Result of filtering diffs.
#[derive(Debug, Default)]
pub struct FilterResult {
    /// Diffs that passed the filter.
    pub kept: Vec<FileDiff>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was excluded from a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Effective path of the skipped file.
    pub path: String,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was excluded from a commit. Not an error.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::filter::SkipReason;
///
/// assert_eq!(SkipReason::NoBlameTarget.to_string(), "no blame target");
/// assert_eq!(SkipReason::Language("PHP".into()).kind(), "language");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Git reported the file as binary.
    Binary,
    /// The diff carries no content blocks.
    EmptyContent,
    /// The file did not exist before the commit.
    NoBlameTarget,
    /// The file's language is not in the allow-list.
    Language(String),
    /// Matched a custom skip pattern.
    PatternMatch(String),
    /// Blame of the original file returned nothing.
    NoBlameData,
}

impl SkipReason {
    /// Stable label of the reason without its detail, used for tallies.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::Binary => "binary",
            SkipReason::EmptyContent => "empty_content",
            SkipReason::NoBlameTarget => "no_blame_target",
            SkipReason::Language(_) => "language",
            SkipReason::PatternMatch(_) => "pattern_match",
            SkipReason::NoBlameData => "no_blame_data",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Binary => write!(f, "binary file"),
            SkipReason::EmptyContent => write!(f, "empty content"),
            SkipReason::NoBlameTarget => write!(f, "no blame target"),
            SkipReason::Language(lang) => write!(f, "language: {lang}"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
            SkipReason::NoBlameData => write!(f, "no blame data"),
        }
    }
}
