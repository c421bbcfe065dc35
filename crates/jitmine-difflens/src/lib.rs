//! Unified-diff parsing and per-file aggregation.
//!
//! Turns the raw text of a commit's diff into one [`aggregate::FileDiff`]
//! per file. Parsing is a pure function of its input; files fail
//! independently so one malformed block never hides the rest of a commit.

pub mod aggregate;
pub mod filter;
pub mod hunks;
pub mod parser;

use jitmine_core::JitError;

/// Parse every `diff --git` block of a commit's diff text.
///
/// Results are in diff order, one per block. A block that fails to parse
/// yields its error in place without affecting the others.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::parse_commit_diff;
///
/// let text = "diff --git a/a.rs b/a.rs\n\
///             --- a/a.rs\n\
///             +++ b/a.rs\n\
///             @@ -1 +1 @@\n\
///             -old\n\
///             +new\n\
///             diff --git a/b.rs b/b.rs\n\
///             ??? not a diff line\n";
/// let files = parse_commit_diff(text);
/// assert_eq!(files.len(), 2);
/// assert!(files[0].is_ok());
/// assert!(files[1].is_err());
/// ```
pub fn parse_commit_diff(text: &str) -> Vec<Result<aggregate::FileDiff, JitError>> {
    let blocks = parser::split_diff_blocks(text);
    tracing::trace!(blocks = blocks.len(), "split commit diff");
    blocks
        .iter()
        .map(|block| aggregate::parse_file_diff(block))
        .collect()
}
