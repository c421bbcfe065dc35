use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One block of a file's diff content.
///
/// A block holding only `ab` lines is unchanged context. A block with `a`
/// and/or `b` lines is a change region: `a` holds removed lines and `b`
/// added lines, both without their diff prefix.
///
/// # Examples
///
/// ```
/// use jitmine_core::Hunk;
///
/// let change = Hunk::change(vec!["old".into()], vec!["new".into()]);
/// assert!(change.is_change());
///
/// let context = Hunk::context(vec!["same".into()]);
/// assert!(!context.is_change());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Unchanged lines present on both sides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ab: Vec<String>,
    /// Lines removed from the original side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<String>,
    /// Lines added on the new side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub b: Vec<String>,
}

impl Hunk {
    /// Create a pure context block.
    pub fn context(lines: Vec<String>) -> Self {
        Self {
            ab: lines,
            ..Self::default()
        }
    }

    /// Create a change block from removed and added lines.
    pub fn change(removed: Vec<String>, added: Vec<String>) -> Self {
        Self {
            ab: Vec::new(),
            a: removed,
            b: added,
        }
    }

    /// Whether this block removes or adds at least one line.
    pub fn is_change(&self) -> bool {
        !self.a.is_empty() || !self.b.is_empty()
    }

    /// Whether the block holds no lines at all.
    pub fn is_empty(&self) -> bool {
        self.ab.is_empty() && self.a.is_empty() && self.b.is_empty()
    }
}

/// Commit metadata as reported by the history source.
///
/// # Examples
///
/// ```
/// use jitmine_core::CommitMeta;
///
/// let meta = CommitMeta {
///     id: "4f2a9c".into(),
///     parent: Some("11aa22".into()),
///     author: "alice".into(),
///     date: 1_700_000_000,
///     subject: "fix: handle empty input".into(),
///     message: "fix: handle empty input".into(),
/// };
/// assert!(meta.parent.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Full commit hash.
    pub id: String,
    /// First parent, `None` for a root commit.
    pub parent: Option<String>,
    /// Author display name.
    pub author: String,
    /// Committer timestamp (unix seconds).
    pub date: i64,
    /// First line of the message.
    pub subject: String,
    /// Full message with lines joined by a single space.
    pub message: String,
}

/// The just-in-time feature record of a single commit.
///
/// Field order is the column contract of exported datasets.
///
/// # Examples
///
/// ```
/// use jitmine_core::CommitFeature;
///
/// let feature = CommitFeature { id: "abc".into(), date: 10, ..CommitFeature::default() };
/// let json = serde_json::to_value(&feature).unwrap();
/// assert_eq!(json["_id"], "abc");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitFeature {
    /// Commit hash.
    #[serde(rename = "_id")]
    pub id: String,
    /// Committer timestamp (unix seconds).
    pub date: i64,
    /// Number of distinct subsystems touched.
    pub ns: u64,
    /// Number of distinct directories touched.
    pub nd: u64,
    /// Number of distinct file names touched.
    pub nf: u64,
    /// Distribution of modified lines across files.
    pub entropy: f64,
    /// Lines added.
    pub la: u64,
    /// Lines deleted.
    pub ld: u64,
    /// Lines in the touched files before the change.
    pub lt: u64,
    /// `1` when the message looks like a bug fix.
    pub fix: u8,
    /// Distinct developers that ever touched the files.
    pub ndev: u64,
    /// Mean days since the touched files were last changed.
    pub age: f64,
    /// Cumulative number of changes to the touched files.
    pub nuc: u64,
    /// Developer experience.
    pub exp: u64,
    /// Recency-weighted developer experience.
    pub rexp: f64,
    /// Developer experience in the touched subsystems.
    pub sexp: u64,
}

/// Whether a feature sequence is in non-decreasing date order.
///
/// History-derived features are only meaningful when this holds.
///
/// # Examples
///
/// ```
/// use jitmine_core::{is_sorted_by_date, CommitFeature};
///
/// let a = CommitFeature { date: 1, ..CommitFeature::default() };
/// let b = CommitFeature { date: 2, ..CommitFeature::default() };
/// assert!(is_sorted_by_date(&[a.clone(), b.clone()]));
/// assert!(!is_sorted_by_date(&[b, a]));
/// ```
pub fn is_sorted_by_date(features: &[CommitFeature]) -> bool {
    features.windows(2).all(|w| w[0].date <= w[1].date)
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use jitmine_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
