//! Folds a token stream into a structured per-file diff record.

use std::fmt;

use jitmine_core::{Hunk, JitError};
use serde::{Deserialize, Serialize};

use crate::parser::{parse_lines, Side, Token};

/// Mode string that marks a side of the diff as non-existent.
pub const ABSENT_MODE: &str = "0000000";

/// One side (original or new) of a file diff.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::aggregate::FileSide;
///
/// let side = FileSide { file: Some("src/lib.rs".into()), mode: Some("0000000".into()), blob: None };
/// assert!(side.is_absent());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSide {
    /// Path on this side, `None` when the marker was `/dev/null`.
    pub file: Option<String>,
    /// Octal file mode, when known.
    pub mode: Option<String>,
    /// Abbreviated blob id from the `index` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl FileSide {
    /// Whether the file does not exist on this side.
    pub fn is_absent(&self) -> bool {
        self.mode.as_deref() == Some(ABSENT_MODE)
    }
}

/// Line-count metadata for the original side of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMeta {
    /// Lines covered by the hunks on this side.
    pub lines: u64,
}

/// A complete diff for a single file.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::aggregate::aggregate;
/// use jitmine_difflens::parser::parse_lines;
///
/// let lines = [
///     "diff --git a/hello.rs b/hello.rs",
///     "--- a/hello.rs",
///     "+++ b/hello.rs",
///     "@@ -1,2 +1,3 @@",
///     " fn main() {",
///     "+    println!(\"hello\");",
///     " }",
/// ];
/// let diff = aggregate(parse_lines(&lines).unwrap()).unwrap();
/// assert_eq!(diff.content.len(), 3);
/// assert_eq!(diff.added_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Original side.
    pub from: FileSide,
    /// New side.
    pub to: FileSide,
    /// Whether the file was renamed; both paths are then present and differ.
    pub rename: bool,
    /// Whether git reported the file as binary.
    pub is_binary: bool,
    /// Context and change blocks in file order.
    pub content: Vec<Hunk>,
    /// Original-side line count taken from the hunk headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_a: Option<SideMeta>,
}

impl FileDiff {
    /// Name of the file before the change, used as the blame target.
    ///
    /// Falls back to the new-side name for a file that did not exist before.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_difflens::aggregate::{FileDiff, FileSide};
    ///
    /// let diff = FileDiff {
    ///     from: FileSide { file: None, mode: Some("0000000".into()), blob: None },
    ///     to: FileSide { file: Some("new.rs".into()), mode: Some("100644".into()), blob: None },
    ///     ..FileDiff::default()
    /// };
    /// assert_eq!(diff.name_a(), Some("new.rs"));
    /// ```
    pub fn name_a(&self) -> Option<&str> {
        if self.rename || !self.from.is_absent() {
            self.from.file.as_deref().or(self.to.file.as_deref())
        } else {
            self.to.file.as_deref().or(self.from.file.as_deref())
        }
    }

    /// Name of the file after the change, used as its key in a commit.
    ///
    /// Falls back to the original-side name for a deleted file.
    pub fn name_b(&self) -> Option<&str> {
        if self.rename || !self.to.is_absent() {
            self.to.file.as_deref().or(self.from.file.as_deref())
        } else {
            self.from.file.as_deref().or(self.to.file.as_deref())
        }
    }

    /// Total number of added lines across all blocks.
    pub fn added_count(&self) -> u64 {
        self.content.iter().map(|h| h.b.len() as u64).sum()
    }

    /// Total number of removed lines across all blocks.
    pub fn removed_count(&self) -> u64 {
        self.content.iter().map(|h| h.a.len() as u64).sum()
    }

    /// Lines of the original file covered by this diff, `0` when unknown.
    pub fn original_lines(&self) -> u64 {
        self.meta_a.map_or(0, |m| m.lines)
    }

    /// Re-render the content blocks as prefixed diff lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_core::Hunk;
    /// use jitmine_difflens::aggregate::FileDiff;
    ///
    /// let diff = FileDiff {
    ///     content: vec![Hunk::context(vec!["a".into()]), Hunk::change(vec!["b".into()], vec!["c".into()])],
    ///     ..FileDiff::default()
    /// };
    /// assert_eq!(diff.render_content(), vec![" a", "-b", "+c"]);
    /// ```
    pub fn render_content(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for hunk in &self.content {
            lines.extend(hunk.ab.iter().map(|l| format!(" {l}")));
            lines.extend(hunk.a.iter().map(|l| format!("-{l}")));
            lines.extend(hunk.b.iter().map(|l| format!("+{l}")));
        }
        lines
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name_b().unwrap_or("<unknown>");
        if self.is_binary {
            return write!(f, "{name} (binary)");
        }
        write!(
            f,
            "{name} (+{} -{}, {} blocks)",
            self.added_count(),
            self.removed_count(),
            self.content.len()
        )?;
        if self.rename {
            if let Some(from) = &self.from.file {
                write!(f, " renamed from {from}")?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct BlockBuilder {
    context: Vec<String>,
    removed: Vec<String>,
    added: Vec<String>,
}

impl BlockBuilder {
    fn push_context(&mut self, out: &mut Vec<Hunk>, text: String) {
        self.flush_change(out);
        self.context.push(text);
    }

    fn push_removed(&mut self, out: &mut Vec<Hunk>, text: String) {
        self.flush_context(out);
        if !self.added.is_empty() {
            self.flush_change(out);
        }
        self.removed.push(text);
    }

    fn push_added(&mut self, out: &mut Vec<Hunk>, text: String) {
        self.flush_context(out);
        self.added.push(text);
    }

    fn flush_context(&mut self, out: &mut Vec<Hunk>) {
        if !self.context.is_empty() {
            out.push(Hunk::context(std::mem::take(&mut self.context)));
        }
    }

    fn flush_change(&mut self, out: &mut Vec<Hunk>) {
        if !self.removed.is_empty() || !self.added.is_empty() {
            out.push(Hunk::change(
                std::mem::take(&mut self.removed),
                std::mem::take(&mut self.added),
            ));
        }
    }

    fn flush(&mut self, out: &mut Vec<Hunk>) {
        self.flush_context(out);
        self.flush_change(out);
    }
}

/// Assemble a [`FileDiff`] from the tokens of one file's diff block.
///
/// Modes come from mode, new-file, deleted-file and index headers; a
/// `/dev/null` marker or a creation/deletion header without an explicit mode
/// marks that side as [`ABSENT_MODE`]. A binary marker yields `is_binary` and
/// no content.
///
/// # Errors
///
/// Returns [`JitError::Parse`] when the block has no file header or no path
/// can be resolved for either side.
pub fn aggregate(tokens: Vec<Token>) -> Result<FileDiff, JitError> {
    let mut diff = FileDiff::default();
    let mut saw_header = false;
    let mut saw_rename = false;
    let mut index_mode: Option<String> = None;
    let mut old_lines: Option<u64> = None;
    let mut blocks = BlockBuilder::default();

    for token in tokens {
        match token {
            Token::FileDiffHeader { from_file, to_file } => {
                saw_header = true;
                diff.from.file = Some(from_file);
                diff.to.file = Some(to_file);
            }
            Token::RenameFrom { path } => {
                saw_rename = true;
                diff.from.file = Some(path);
            }
            Token::RenameTo { path } => {
                saw_rename = true;
                diff.to.file = Some(path);
            }
            Token::SimilarityIndex { .. } => {}
            Token::ModeHeader { side, mode } => match side {
                Side::Old => diff.from.mode = Some(mode),
                Side::New => diff.to.mode = Some(mode),
            },
            Token::NewFileModeHeader { mode } => {
                diff.from.mode = Some(ABSENT_MODE.to_string());
                diff.to.mode = Some(mode);
            }
            Token::DeletedFileModeHeader { mode } => {
                diff.from.mode = Some(mode);
                diff.to.mode = Some(ABSENT_MODE.to_string());
            }
            Token::IndexHeader {
                from_blob,
                to_blob,
                mode,
            } => {
                diff.from.blob = Some(from_blob);
                diff.to.blob = Some(to_blob);
                index_mode = mode;
            }
            Token::BinaryDiff => diff.is_binary = true,
            Token::AFileChangeHeader { path } => match path {
                Some(path) => diff.from.file = Some(path),
                None => diff.from.mode = Some(ABSENT_MODE.to_string()),
            },
            Token::BFileChangeHeader { path } => match path {
                Some(path) => diff.to.file = Some(path),
                None => diff.to.mode = Some(ABSENT_MODE.to_string()),
            },
            Token::HunkHeader { old_lines: n, .. } => {
                blocks.flush(&mut diff.content);
                *old_lines.get_or_insert(0) += u64::from(n);
            }
            Token::ContextLine { text } => blocks.push_context(&mut diff.content, text),
            Token::RemovedLine { text } => blocks.push_removed(&mut diff.content, text),
            Token::AddedLine { text } => blocks.push_added(&mut diff.content, text),
            Token::NoNewlineMarker => {}
        }
    }
    blocks.flush(&mut diff.content);

    if !saw_header {
        return Err(JitError::Parse("diff block has no file header".into()));
    }
    if diff.from.file.is_none() && diff.to.file.is_none() {
        return Err(JitError::Parse("diff block names no file".into()));
    }

    if let Some(mode) = index_mode {
        diff.from.mode.get_or_insert_with(|| mode.clone());
        diff.to.mode.get_or_insert(mode);
    }
    diff.rename = saw_rename
        && matches!((&diff.from.file, &diff.to.file), (Some(a), Some(b)) if a != b);

    if diff.is_binary {
        diff.content.clear();
    } else {
        diff.meta_a = old_lines.map(|lines| SideMeta { lines });
    }

    Ok(diff)
}

/// Parse and aggregate one `diff --git` block in a single step.
///
/// # Errors
///
/// Propagates [`JitError::DiffLine`] from the classifier and
/// [`JitError::Parse`] from aggregation.
pub fn parse_file_diff<S: AsRef<str>>(lines: &[S]) -> Result<FileDiff, JitError> {
    aggregate(parse_lines(lines)?)
}
