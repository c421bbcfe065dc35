//! Line classifier for one file's section of a unified git diff.
//!
//! Every line is matched against an ordered rule table; the first rule whose
//! pattern matches *and* which may follow the previous line's state wins.
//! Inside a hunk body, lines no header rule accepts are classified by their
//! first character. Anything else is a hard [`JitError::DiffLine`] failure.

use std::sync::LazyLock;

use jitmine_core::JitError;
use regex::{Captures, Regex};
use serde::Serialize;

/// Classification state of a diff line.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::parser::LineState;
///
/// assert!(LineState::AddedLine.in_hunk_body());
/// assert!(!LineState::IndexHeader.in_hunk_body());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    StartOfFile,
    FileDiffHeader,
    RenameFrom,
    RenameTo,
    SimilarityIndex,
    ModeHeader,
    NewFileModeHeader,
    DeletedFileModeHeader,
    IndexHeader,
    BinaryDiff,
    AFileChangeHeader,
    BFileChangeHeader,
    HunkHeader,
    ContextLine,
    RemovedLine,
    AddedLine,
    NoNewlineMarker,
}

impl LineState {
    /// Whether a line in this state belongs to a hunk body.
    pub fn in_hunk_body(self) -> bool {
        BODY.contains(&self)
    }
}

/// Which side of an `old mode` / `new mode` pair a mode header describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

/// A classified diff line with its captured fields.
///
/// `None` paths on the `---` / `+++` markers stand for `/dev/null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Token {
    FileDiffHeader {
        from_file: String,
        to_file: String,
    },
    RenameFrom {
        path: String,
    },
    RenameTo {
        path: String,
    },
    SimilarityIndex {
        percent: u8,
    },
    ModeHeader {
        side: Side,
        mode: String,
    },
    NewFileModeHeader {
        mode: String,
    },
    DeletedFileModeHeader {
        mode: String,
    },
    IndexHeader {
        from_blob: String,
        to_blob: String,
        mode: Option<String>,
    },
    BinaryDiff,
    AFileChangeHeader {
        path: Option<String>,
    },
    BFileChangeHeader {
        path: Option<String>,
    },
    HunkHeader {
        old_start: u32,
        old_lines: u32,
        new_start: u32,
        new_lines: u32,
    },
    ContextLine {
        text: String,
    },
    RemovedLine {
        text: String,
    },
    AddedLine {
        text: String,
    },
    NoNewlineMarker,
}

impl Token {
    /// The state this token leaves the parser in.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_difflens::parser::{LineState, Token};
    ///
    /// assert_eq!(Token::BinaryDiff.state(), LineState::BinaryDiff);
    /// ```
    pub fn state(&self) -> LineState {
        match self {
            Token::FileDiffHeader { .. } => LineState::FileDiffHeader,
            Token::RenameFrom { .. } => LineState::RenameFrom,
            Token::RenameTo { .. } => LineState::RenameTo,
            Token::SimilarityIndex { .. } => LineState::SimilarityIndex,
            Token::ModeHeader { .. } => LineState::ModeHeader,
            Token::NewFileModeHeader { .. } => LineState::NewFileModeHeader,
            Token::DeletedFileModeHeader { .. } => LineState::DeletedFileModeHeader,
            Token::IndexHeader { .. } => LineState::IndexHeader,
            Token::BinaryDiff => LineState::BinaryDiff,
            Token::AFileChangeHeader { .. } => LineState::AFileChangeHeader,
            Token::BFileChangeHeader { .. } => LineState::BFileChangeHeader,
            Token::HunkHeader { .. } => LineState::HunkHeader,
            Token::ContextLine { .. } => LineState::ContextLine,
            Token::RemovedLine { .. } => LineState::RemovedLine,
            Token::AddedLine { .. } => LineState::AddedLine,
            Token::NoNewlineMarker => LineState::NoNewlineMarker,
        }
    }
}

const HEADER: &[LineState] = &[
    LineState::FileDiffHeader,
    LineState::RenameFrom,
    LineState::RenameTo,
    LineState::SimilarityIndex,
    LineState::ModeHeader,
    LineState::NewFileModeHeader,
    LineState::DeletedFileModeHeader,
    LineState::IndexHeader,
];

const BODY: &[LineState] = &[
    LineState::HunkHeader,
    LineState::ContextLine,
    LineState::RemovedLine,
    LineState::AddedLine,
    LineState::NoNewlineMarker,
];

const HUNK_PREDECESSORS: &[LineState] = &[
    LineState::BFileChangeHeader,
    LineState::HunkHeader,
    LineState::ContextLine,
    LineState::RemovedLine,
    LineState::AddedLine,
    LineState::NoNewlineMarker,
];

const CONTENT: &[LineState] = &[
    LineState::ContextLine,
    LineState::RemovedLine,
    LineState::AddedLine,
];

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid pattern ", stringify!($name))));
    };
}

pattern!(DIFF_GIT_QUOTED, r#"^diff --git "a/(?P<from>.*?)"\s+"b/(?P<to>.*?)"\s*$"#);
pattern!(DIFF_GIT_B_QUOTED, r#"^diff --git a/(?P<from>.*?)\s+"b/(?P<to>.*?)"\s*$"#);
pattern!(DIFF_GIT_A_QUOTED, r#"^diff --git "a/(?P<from>.*?)"\s+b/(?P<to>.*?)\s*$"#);
pattern!(DIFF_GIT, r"^diff --git a/(?P<from>.*?)\s+b/(?P<to>.*?)\s*$");
pattern!(OLD_MODE, r"^old mode (?P<mode>\d+)$");
pattern!(NEW_MODE, r"^new mode (?P<mode>\d+)$");
pattern!(NEW_FILE_MODE, r"^new file mode (?P<mode>\d+)$");
pattern!(DELETED_FILE_MODE, r"^deleted file mode (?P<mode>\d+)$");
pattern!(SIMILARITY, r"^(?:dis)?similarity index (?P<percent>\d+)%$");
pattern!(RENAME_FROM, r"^rename from (?P<path>.+?)\s*$");
pattern!(RENAME_TO, r"^rename to (?P<path>.+?)\s*$");
pattern!(
    INDEX,
    r"^index (?P<from_blob>[0-9a-fA-F]+)\.\.(?P<to_blob>[0-9a-fA-F]+)(?: (?P<mode>\d+))?$"
);
pattern!(BINARY, r"^Binary files (?P<a>.+) and (?P<b>.+) differ$");
pattern!(A_SIDE_QUOTED, r#"^--- "a/(?P<path>.*)"\s*$"#);
pattern!(A_SIDE, r"^--- (?:/dev/null|a/(?P<path>.*?))\s*$");
pattern!(B_SIDE_QUOTED, r#"^\+\+\+ "b/(?P<path>.*)"\s*$"#);
pattern!(B_SIDE, r"^\+\+\+ (?:/dev/null|b/(?P<path>.*?))\s*$");
pattern!(
    HUNK,
    r"^@@ -(?P<old_start>\d+)(?:,(?P<old_lines>\d+))? \+(?P<new_start>\d+)(?:,(?P<new_lines>\d+))? @@.*$"
);
pattern!(NO_NEWLINE, r"^\\ No newline at end of file$");

#[derive(Clone, Copy, PartialEq, Eq)]
enum Variant {
    Plain,
    QuotedA,
    QuotedB,
    QuotedBoth,
    OldSide,
    NewSide,
}

struct Rule {
    state: LineState,
    variant: Variant,
    pattern: &'static LazyLock<Regex>,
    after: &'static [LineState],
}

const fn rule(
    state: LineState,
    variant: Variant,
    pattern: &'static LazyLock<Regex>,
    after: &'static [LineState],
) -> Rule {
    Rule {
        state,
        variant,
        pattern,
        after,
    }
}

use LineState as S;
use Variant as V;

/// Ordered rule table. Quoted-path variants precede their generic forms.
static RULES: &[Rule] = &[
    rule(S::FileDiffHeader, V::QuotedBoth, &DIFF_GIT_QUOTED, &[S::StartOfFile]),
    rule(S::FileDiffHeader, V::QuotedB, &DIFF_GIT_B_QUOTED, &[S::StartOfFile]),
    rule(S::FileDiffHeader, V::QuotedA, &DIFF_GIT_A_QUOTED, &[S::StartOfFile]),
    rule(S::FileDiffHeader, V::Plain, &DIFF_GIT, &[S::StartOfFile]),
    rule(S::ModeHeader, V::OldSide, &OLD_MODE, HEADER),
    rule(S::ModeHeader, V::NewSide, &NEW_MODE, HEADER),
    rule(S::NewFileModeHeader, V::Plain, &NEW_FILE_MODE, HEADER),
    rule(S::DeletedFileModeHeader, V::Plain, &DELETED_FILE_MODE, HEADER),
    rule(S::SimilarityIndex, V::Plain, &SIMILARITY, HEADER),
    rule(S::RenameFrom, V::Plain, &RENAME_FROM, HEADER),
    rule(S::RenameTo, V::Plain, &RENAME_TO, HEADER),
    rule(S::IndexHeader, V::Plain, &INDEX, HEADER),
    rule(S::BinaryDiff, V::Plain, &BINARY, HEADER),
    rule(S::AFileChangeHeader, V::QuotedA, &A_SIDE_QUOTED, HEADER),
    rule(S::AFileChangeHeader, V::Plain, &A_SIDE, HEADER),
    rule(S::BFileChangeHeader, V::QuotedB, &B_SIDE_QUOTED, &[S::AFileChangeHeader]),
    rule(S::BFileChangeHeader, V::Plain, &B_SIDE, &[S::AFileChangeHeader]),
    rule(S::HunkHeader, V::Plain, &HUNK, HUNK_PREDECESSORS),
    rule(S::NoNewlineMarker, V::Plain, &NO_NEWLINE, CONTENT),
];

/// Classify the lines of one `diff --git` block into tokens.
///
/// # Errors
///
/// Returns [`JitError::DiffLine`] with the 1-based line index for the first
/// line that no rule accepts in the current state.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::parser::{parse_lines, LineState};
///
/// let lines = [
///     "diff --git a/foo.py b/foo.py",
///     "index ab12..cd34 100644",
///     "--- a/foo.py",
///     "+++ b/foo.py",
///     "@@ -1,2 +1,2 @@",
///     "-old",
///     "+new",
///     " same",
/// ];
/// let tokens = parse_lines(&lines).unwrap();
/// assert_eq!(tokens.len(), 8);
/// assert_eq!(tokens[5].state(), LineState::RemovedLine);
/// ```
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Token>, JitError> {
    let mut tokens = Vec::with_capacity(lines.len());
    let mut prev_state = LineState::StartOfFile;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let token = classify(line, prev_state).ok_or_else(|| JitError::DiffLine {
            line: index + 1,
            text: line.to_string(),
        })?;
        prev_state = token.state();
        tokens.push(token);
    }

    Ok(tokens)
}

fn classify(line: &str, prev_state: LineState) -> Option<Token> {
    for rule in RULES {
        if !rule.after.contains(&prev_state) {
            continue;
        }
        if let Some(caps) = rule.pattern.captures(line) {
            if let Some(token) = build_token(rule, &caps) {
                return Some(token);
            }
        }
    }

    if !prev_state.in_hunk_body() {
        return None;
    }

    let text = || line[1..].to_string();
    match line.as_bytes().first() {
        Some(b' ') => Some(Token::ContextLine { text: text() }),
        Some(b'-') => Some(Token::RemovedLine { text: text() }),
        Some(b'+') => Some(Token::AddedLine { text: text() }),
        _ => None,
    }
}

fn build_token(rule: &Rule, caps: &Captures<'_>) -> Option<Token> {
    let get = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    let from_quoted = matches!(rule.variant, V::QuotedA | V::QuotedBoth);
    let to_quoted = matches!(rule.variant, V::QuotedB | V::QuotedBoth);
    let path = |quoted: bool| get("path").map(|p| if quoted { unquote(&p) } else { p });

    let token = match rule.state {
        S::FileDiffHeader => {
            let from = get("from")?;
            let to = get("to")?;
            Token::FileDiffHeader {
                from_file: if from_quoted { unquote(&from) } else { from },
                to_file: if to_quoted { unquote(&to) } else { to },
            }
        }
        S::ModeHeader => Token::ModeHeader {
            side: if rule.variant == V::OldSide {
                Side::Old
            } else {
                Side::New
            },
            mode: get("mode")?,
        },
        S::NewFileModeHeader => Token::NewFileModeHeader { mode: get("mode")? },
        S::DeletedFileModeHeader => Token::DeletedFileModeHeader { mode: get("mode")? },
        S::SimilarityIndex => Token::SimilarityIndex {
            percent: get("percent")?.parse().ok()?,
        },
        S::RenameFrom => Token::RenameFrom {
            path: strip_quotes(&get("path")?),
        },
        S::RenameTo => Token::RenameTo {
            path: strip_quotes(&get("path")?),
        },
        S::IndexHeader => Token::IndexHeader {
            from_blob: get("from_blob")?,
            to_blob: get("to_blob")?,
            mode: get("mode"),
        },
        S::BinaryDiff => Token::BinaryDiff,
        S::AFileChangeHeader => Token::AFileChangeHeader {
            path: path(from_quoted),
        },
        S::BFileChangeHeader => Token::BFileChangeHeader {
            path: path(to_quoted),
        },
        S::HunkHeader => Token::HunkHeader {
            old_start: get("old_start")?.parse().ok()?,
            old_lines: get("old_lines").map_or(Some(1), |v| v.parse().ok())?,
            new_start: get("new_start")?.parse().ok()?,
            new_lines: get("new_lines").map_or(Some(1), |v| v.parse().ok())?,
        },
        S::NoNewlineMarker => Token::NoNewlineMarker,
        _ => return None,
    };
    Some(token)
}

fn strip_quotes(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => unquote(inner),
        None => raw.to_string(),
    }
}

/// Undo git's C-style path quoting (`\"`, `\\`, `\t`, `\n` and octal bytes).
fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        match next {
            b'0'..=b'7' => {
                let mut value: u32 = 0;
                let mut len = 0;
                while len < 3 {
                    match bytes.get(i + 1 + len) {
                        Some(d @ b'0'..=b'7') => value = value * 8 + u32::from(d - b'0'),
                        _ => break,
                    }
                    len += 1;
                }
                match u8::try_from(value) {
                    Ok(byte) => out.push(byte),
                    // not a byte: keep the escape as written
                    Err(_) => out.extend_from_slice(&bytes[i..i + 1 + len]),
                }
                i += 1 + len;
            }
            b't' => {
                out.push(b'\t');
                i += 2;
            }
            b'n' => {
                out.push(b'\n');
                i += 2;
            }
            other => {
                out.push(other);
                i += 2;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a whole commit diff into per-file blocks at `diff --git` boundaries.
///
/// Lines before the first boundary are ignored.
///
/// # Examples
///
/// ```
/// use jitmine_difflens::parser::split_diff_blocks;
///
/// let text = "diff --git a/a b/a\n+x\ndiff --git a/b b/b\n+y\n";
/// let blocks = split_diff_blocks(text);
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[1], vec!["diff --git a/b b/b", "+y"]);
/// ```
pub fn split_diff_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if line.starts_with("diff --git") {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(tokens: &[Token]) -> Vec<LineState> {
        tokens.iter().map(Token::state).collect()
    }

    #[test]
    fn modified_file_header_sequence() {
        let lines = [
            "diff --git a/src/main.rs b/src/main.rs",
            "index abc1234..def5678 100644",
            "--- a/src/main.rs",
            "+++ b/src/main.rs",
            "@@ -1,3 +1,4 @@ fn main() {",
            " fn main() {",
            "+    println!(\"hello\");",
            "     let x = 1;",
            " }",
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(
            states(&tokens),
            vec![
                LineState::FileDiffHeader,
                LineState::IndexHeader,
                LineState::AFileChangeHeader,
                LineState::BFileChangeHeader,
                LineState::HunkHeader,
                LineState::ContextLine,
                LineState::AddedLine,
                LineState::ContextLine,
                LineState::ContextLine,
            ]
        );
        assert_eq!(
            tokens[0],
            Token::FileDiffHeader {
                from_file: "src/main.rs".into(),
                to_file: "src/main.rs".into(),
            }
        );
        assert_eq!(
            tokens[1],
            Token::IndexHeader {
                from_blob: "abc1234".into(),
                to_blob: "def5678".into(),
                mode: Some("100644".into()),
            }
        );
        assert_eq!(
            tokens[4],
            Token::HunkHeader {
                old_start: 1,
                old_lines: 3,
                new_start: 1,
                new_lines: 4,
            }
        );
    }

    #[test]
    fn quoted_paths_with_spaces() {
        let lines = [
            r#"diff --git "a/docs/my file.md" "b/docs/my file.md""#,
            "index 1111111..2222222 100644",
            r#"--- "a/docs/my file.md""#,
            r#"+++ "b/docs/my file.md""#,
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(
            tokens[0],
            Token::FileDiffHeader {
                from_file: "docs/my file.md".into(),
                to_file: "docs/my file.md".into(),
            }
        );
        assert_eq!(
            tokens[2],
            Token::AFileChangeHeader {
                path: Some("docs/my file.md".into())
            }
        );
    }

    #[test]
    fn one_sided_quoting_is_recognized() {
        let tokens = parse_lines(&[r#"diff --git a/plain.txt "b/caf\303\251.txt""#]).unwrap();
        assert_eq!(
            tokens[0],
            Token::FileDiffHeader {
                from_file: "plain.txt".into(),
                to_file: "café.txt".into(),
            }
        );

        let tokens = parse_lines(&[r#"diff --git "a/caf\303\251.txt" b/plain.txt"#]).unwrap();
        assert_eq!(
            tokens[0],
            Token::FileDiffHeader {
                from_file: "café.txt".into(),
                to_file: "plain.txt".into(),
            }
        );
    }

    #[test]
    fn new_and_deleted_files_use_dev_null() {
        let created = [
            "diff --git a/new.rs b/new.rs",
            "new file mode 100644",
            "index 0000000..e69de29",
            "--- /dev/null",
            "+++ b/new.rs",
            "@@ -0,0 +1 @@",
            "+fn hello() {}",
        ];
        let tokens = parse_lines(&created).unwrap();
        assert_eq!(
            tokens[1],
            Token::NewFileModeHeader {
                mode: "100644".into()
            }
        );
        assert_eq!(tokens[3], Token::AFileChangeHeader { path: None });
        assert_eq!(
            tokens[5],
            Token::HunkHeader {
                old_start: 0,
                old_lines: 0,
                new_start: 1,
                new_lines: 1,
            }
        );

        let deleted = [
            "diff --git a/old.rs b/old.rs",
            "deleted file mode 100755",
            "index e69de29..0000000",
            "--- a/old.rs",
            "+++ /dev/null",
        ];
        let tokens = parse_lines(&deleted).unwrap();
        assert_eq!(tokens[4], Token::BFileChangeHeader { path: None });
    }

    #[test]
    fn rename_with_similarity_and_mode_change() {
        let lines = [
            "diff --git a/old_name.rs b/new_name.rs",
            "old mode 100644",
            "new mode 100755",
            "similarity index 92%",
            "rename from old_name.rs",
            "rename to new_name.rs",
            "index 1234567..89abcde",
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(
            tokens[1],
            Token::ModeHeader {
                side: Side::Old,
                mode: "100644".into()
            }
        );
        assert_eq!(
            tokens[2],
            Token::ModeHeader {
                side: Side::New,
                mode: "100755".into()
            }
        );
        assert_eq!(tokens[3], Token::SimilarityIndex { percent: 92 });
        assert_eq!(
            tokens[5],
            Token::RenameTo {
                path: "new_name.rs".into()
            }
        );
        assert_eq!(
            tokens[6],
            Token::IndexHeader {
                from_blob: "1234567".into(),
                to_blob: "89abcde".into(),
                mode: None,
            }
        );
    }

    #[test]
    fn binary_marker() {
        let lines = [
            "diff --git a/img.png b/img.png",
            "index 1234567..89abcde 100644",
            "Binary files a/img.png and b/img.png differ",
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(tokens[2], Token::BinaryDiff);
    }

    #[test]
    fn header_lookalikes_inside_body_are_content() {
        let lines = [
            "diff --git a/notes.md b/notes.md",
            "--- a/notes.md",
            "+++ b/notes.md",
            "@@ -1,2 +1,2 @@",
            "--- a/removed-looking-line",
            "+++ b/added-looking-line",
            " index 1..2",
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(
            tokens[4],
            Token::RemovedLine {
                text: "-- a/removed-looking-line".into()
            }
        );
        assert_eq!(
            tokens[5],
            Token::AddedLine {
                text: "++ b/added-looking-line".into()
            }
        );
        assert_eq!(
            tokens[6],
            Token::ContextLine {
                text: "index 1..2".into()
            }
        );
    }

    #[test]
    fn no_newline_marker_follows_content() {
        let lines = [
            "diff --git a/f.rs b/f.rs",
            "--- a/f.rs",
            "+++ b/f.rs",
            "@@ -1 +1 @@",
            "-old",
            "\\ No newline at end of file",
            "+new",
            "\\ No newline at end of file",
        ];
        let tokens = parse_lines(&lines).unwrap();
        assert_eq!(tokens[5], Token::NoNewlineMarker);
        assert_eq!(tokens[7], Token::NoNewlineMarker);
    }

    #[test]
    fn unexpected_line_reports_one_based_index() {
        let lines = [
            "diff --git a/f.rs b/f.rs",
            "--- a/f.rs",
            "+++ b/f.rs",
            "@@ -1 +1 @@",
            "garbage without prefix",
        ];
        let err = parse_lines(&lines).unwrap_err();
        match err {
            JitError::DiffLine { line, text } => {
                assert_eq!(line, 5);
                assert_eq!(text, "garbage without prefix");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn content_before_hunk_header_fails() {
        let lines = ["diff --git a/f.rs b/f.rs", "+sneaky"];
        let err = parse_lines(&lines).unwrap_err();
        assert!(matches!(err, JitError::DiffLine { line: 2, .. }));
    }

    #[test]
    fn second_file_header_in_block_fails() {
        let lines = ["diff --git a/a b/a", "diff --git a/b b/b"];
        assert!(matches!(
            parse_lines(&lines),
            Err(JitError::DiffLine { line: 2, .. })
        ));
    }

    #[test]
    fn empty_line_in_body_fails() {
        let lines = ["diff --git a/a b/a", "--- a/a", "+++ b/a", "@@ -1 +1 @@", ""];
        assert!(matches!(
            parse_lines(&lines),
            Err(JitError::DiffLine { line: 5, .. })
        ));
    }

    #[test]
    fn split_ignores_preamble_lines() {
        let text = "\ncommit noise\ndiff --git a/x b/x\n+1\n";
        let blocks = split_diff_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][0], "diff --git a/x b/x");
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote(r#"a\"b"#), "a\"b");
        assert_eq!(unquote(r"tab\there"), "tab\there");
        assert_eq!(unquote(r"back\\slash"), "back\\slash");
        assert_eq!(unquote(r"caf\303\251"), "café");
        assert_eq!(unquote(r"over\777flow"), r"over\777flow");
        assert_eq!(unquote(r"\400\101"), r"\400A");
    }
}
