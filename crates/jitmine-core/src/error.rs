use std::path::PathBuf;

/// Errors that can occur across the jitmine pipeline.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette::Report` at the boundary.
///
/// Files that are excluded from a commit (binary, pure additions, filtered
/// languages) are not errors; see the `SkipReason` type in `jitmine-difflens`.
///
/// # Examples
///
/// ```
/// use jitmine_core::JitError;
///
/// let err = JitError::DiffLine { line: 4, text: "garbage".into() };
/// assert_eq!(err.to_string(), "line 4: unrecognized diff line \"garbage\"");
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum JitError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git repository access or `git` command failure.
    #[error("git error: {0}")]
    Git(String),

    /// Malformed commit metadata or hunk header.
    #[error("parse error: {0}")]
    Parse(String),

    /// A diff line that no rule accepts in the current parser state.
    #[error("line {line}: unrecognized diff line {text:?}")]
    #[diagnostic(code(jitmine::diff_line))]
    DiffLine {
        /// 1-based index of the offending line within its diff block.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A commit was folded out of chronological order.
    #[error("commit {id} dated {date} precedes the last folded commit dated {last}")]
    #[diagnostic(
        code(jitmine::sequencing),
        help("commits must be folded in non-decreasing commit-date order")
    )]
    Sequencing {
        /// Id of the rejected commit.
        id: String,
        /// Unix timestamp of the rejected commit.
        date: i64,
        /// Unix timestamp of the last commit folded into the history.
        last: i64,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: JitError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn diff_line_error_names_line_and_text() {
        let err = JitError::DiffLine {
            line: 12,
            text: "@@ broken".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("line 12:"));
        assert!(msg.contains("@@ broken"));
    }

    #[test]
    fn sequencing_error_shows_both_dates() {
        let err = JitError::Sequencing {
            id: "abc123".into(),
            date: 100,
            last: 200,
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("100"));
        assert!(msg.contains("200"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = JitError::FileNotFound(PathBuf::from("/tmp/missing.diff"));
        assert!(err.to_string().contains("/tmp/missing.diff"));
    }
}
