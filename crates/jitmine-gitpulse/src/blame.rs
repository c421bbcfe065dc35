//! Line-attribution parsing.
//!
//! Parses `git blame -t -n -l` listings into one entry per owning commit
//! holding the contiguous ranges of current-file lines it last touched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BLAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\d+)\s+\((.*?)\s+(\d+)\s+[-+]\d{4}\s+(\d+)\)(.*)$")
        .expect("valid blame pattern")
});

/// An inclusive range of line numbers in the attributed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First line, 1-based.
    pub start: u32,
    /// Last line, inclusive.
    pub end: u32,
}

/// Everything attributed to one commit within a file.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::blame::{BlameEntry, LineRange};
///
/// let entry = BlameEntry {
///     author: "alice".into(),
///     time: 1_700_000_000,
///     ranges: vec![LineRange { start: 1, end: 4 }],
/// };
/// assert_eq!(entry.line_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameEntry {
    /// Author of the owning commit, from the first line seen for it.
    pub author: String,
    /// Attribution timestamp (unix seconds).
    pub time: i64,
    /// Minimal, ordered set of attributed line ranges.
    pub ranges: Vec<LineRange>,
}

impl BlameEntry {
    /// Number of lines attributed to this commit.
    pub fn line_count(&self) -> u64 {
        self.ranges
            .iter()
            .map(|r| u64::from(r.end.saturating_sub(r.start)) + 1)
            .sum()
    }

    fn attribute(&mut self, line: u32) {
        match self.ranges.last_mut() {
            Some(last) if last.end.checked_add(1) == Some(line) => last.end = line,
            _ => self.ranges.push(LineRange {
                start: line,
                end: line,
            }),
        }
    }
}

/// Blame of one file, keyed by owning commit id.
pub type FileBlame = BTreeMap<String, BlameEntry>;

/// One tokenized line of a blame listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// Owning commit id as printed (boundary commits keep their `^`).
    pub commit: String,
    /// Line number in the owning commit's version of the file.
    pub orig_line: u32,
    /// Author display name.
    pub author: String,
    /// Attribution timestamp (unix seconds).
    pub time: i64,
    /// Line number in the blamed revision.
    pub final_line: u32,
}

/// Tokenize a single blame line.
///
/// Filename tokens git prints between the commit id and the line number
/// (for lines that originate from a renamed file) are discarded.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::blame::parse_blame_line;
///
/// let line = "4f2a9c0d 12 (Alice Smith 1700000000 +0100 14) let x = 1;";
/// let parsed = parse_blame_line(line).unwrap();
/// assert_eq!(parsed.author, "Alice Smith");
/// assert_eq!(parsed.final_line, 14);
/// ```
pub fn parse_blame_line(line: &str) -> Option<BlameLine> {
    let line = line.trim_matches('\t').trim();
    let mut tokens = line.split_whitespace();
    let commit = tokens.next()?;
    let rest: Vec<&str> = tokens
        .skip_while(|t| !t.bytes().all(|b| b.is_ascii_digit()))
        .collect();
    if rest.is_empty() {
        return None;
    }
    let normalized = format!("{commit} {}", rest.join(" "));

    let caps = BLAME_LINE.captures(&normalized)?;
    Some(BlameLine {
        commit: caps[1].to_string(),
        orig_line: caps[2].parse().ok()?,
        author: caps[3].to_string(),
        time: caps[4].parse().ok()?,
        final_line: caps[5].parse().ok()?,
    })
}

/// Parse a blame listing into per-commit line ranges.
///
/// Lines that do not tokenize are dropped. The author and time of an entry
/// come from the first line attributed to its commit.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::blame::{parse_blame, LineRange};
///
/// let listing = [
///     "aaaa 1 (alice 100 +0000 1) fn a() {",
///     "aaaa 2 (alice 100 +0000 2) }",
///     "bbbb 1 (bob 200 +0000 3) fn b() {}",
/// ];
/// let blame = parse_blame(&listing);
/// assert_eq!(blame["aaaa"].ranges, vec![LineRange { start: 1, end: 2 }]);
/// assert_eq!(blame["bbbb"].author, "bob");
/// ```
pub fn parse_blame<S: AsRef<str>>(lines: &[S]) -> FileBlame {
    let mut blame = FileBlame::new();
    let mut dropped = 0usize;

    for raw in lines {
        let Some(line) = parse_blame_line(raw.as_ref()) else {
            if !raw.as_ref().trim().is_empty() {
                dropped += 1;
            }
            continue;
        };
        blame
            .entry(line.commit)
            .or_insert_with(|| BlameEntry {
                author: line.author,
                time: line.time,
                ranges: Vec::new(),
            })
            .attribute(line.final_line);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "dropped untokenizable blame lines");
    }
    blame
}

/// Latest attribution time across all entries, `None` for an empty blame.
pub fn latest_time(blame: &FileBlame) -> Option<i64> {
    blame.values().map(|e| e.time).max()
}

/// Merge ranges that overlap or touch, preserving order.
///
/// Applying this to its own output changes nothing.
///
/// # Examples
///
/// ```
/// use jitmine_gitpulse::blame::{merge_ranges, LineRange};
///
/// let merged = merge_ranges(&[
///     LineRange { start: 1, end: 2 },
///     LineRange { start: 3, end: 3 },
///     LineRange { start: 7, end: 9 },
/// ]);
/// assert_eq!(merged, vec![LineRange { start: 1, end: 3 }, LineRange { start: 7, end: 9 }]);
/// ```
pub fn merge_ranges(ranges: &[LineRange]) -> Vec<LineRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<LineRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HASH_A: &str = "3f1c9a2b7e4d5f60718293a4b5c6d7e8f9012345";
    const HASH_B: &str = "9e8d7c6b5a4f3e2d1c0b9a8f7e6d5c4b3a291807";

    #[test]
    fn tokenizes_standard_line() {
        let line = format!("{HASH_A} 3 (Jane Doe 1650000000 -0700 5) \tindented();");
        let parsed = parse_blame_line(&line).unwrap();
        assert_eq!(parsed.commit, HASH_A);
        assert_eq!(parsed.orig_line, 3);
        assert_eq!(parsed.author, "Jane Doe");
        assert_eq!(parsed.time, 1_650_000_000);
        assert_eq!(parsed.final_line, 5);
    }

    #[test]
    fn strips_filename_tokens_of_renamed_origin() {
        let line = format!("{HASH_A} src/old name.rs 8 (bob 1600000000 +0000 2) x");
        let parsed = parse_blame_line(&line).unwrap();
        assert_eq!(parsed.orig_line, 8);
        assert_eq!(parsed.author, "bob");
        assert_eq!(parsed.final_line, 2);
    }

    #[test]
    fn keeps_boundary_marker_on_commit_id() {
        let line = "^a1b2c3d 1 (root 1500000000 +0000 1) first";
        assert_eq!(parse_blame_line(line).unwrap().commit, "^a1b2c3d");
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(parse_blame_line("").is_none());
        assert!(parse_blame_line(HASH_A).is_none());
        assert!(parse_blame_line(&format!("{HASH_A} 1 (alice")).is_none());
    }

    #[test]
    fn contiguous_lines_extend_a_range() {
        let listing: Vec<String> = [(HASH_A, 1), (HASH_A, 2), (HASH_B, 3), (HASH_A, 4), (HASH_A, 5)]
            .iter()
            .map(|(h, n)| format!("{h} {n} (dev 1000 +0000 {n}) line {n}"))
            .collect();
        let blame = parse_blame(&listing);
        assert_eq!(
            blame[HASH_A].ranges,
            vec![LineRange { start: 1, end: 2 }, LineRange { start: 4, end: 5 }]
        );
        assert_eq!(blame[HASH_B].ranges, vec![LineRange { start: 3, end: 3 }]);
        assert_eq!(blame[HASH_A].line_count(), 4);
    }

    #[test]
    fn author_and_time_come_from_first_line() {
        let listing = [
            format!("{HASH_A} 1 (first 100 +0000 1) a"),
            format!("{HASH_A} 2 (second 200 +0000 2) b"),
        ];
        let blame = parse_blame(&listing);
        assert_eq!(blame[HASH_A].author, "first");
        assert_eq!(blame[HASH_A].time, 100);
    }

    #[test]
    fn garbage_lines_are_dropped() {
        let listing = [
            "not a blame line".to_string(),
            format!("{HASH_B} 1 (carol 300 +0000 1) ok"),
            String::new(),
        ];
        let blame = parse_blame(&listing);
        assert_eq!(blame.len(), 1);
        assert_eq!(latest_time(&blame), Some(300));
    }

    #[test]
    fn empty_listing_has_no_latest_time() {
        let blame = parse_blame::<&str>(&[]);
        assert!(blame.is_empty());
        assert_eq!(latest_time(&blame), None);
    }

    #[test]
    fn parsed_ranges_are_already_minimal() {
        let listing: Vec<String> = [1, 2, 3, 6, 7, 10]
            .iter()
            .map(|n| format!("{HASH_A} {n} (dev 1 +0000 {n}) x"))
            .collect();
        let blame = parse_blame(&listing);
        let ranges = &blame[HASH_A].ranges;
        assert_eq!(&merge_ranges(ranges), ranges);
    }

    #[test]
    fn last_representable_line_does_not_overflow() {
        let listing = [
            format!("{HASH_A} 1 (dev 1 +0000 {}) x", u32::MAX),
            format!("{HASH_A} 2 (dev 1 +0000 1) y"),
        ];
        let blame = parse_blame(&listing);
        assert_eq!(
            blame[HASH_A].ranges,
            vec![
                LineRange { start: u32::MAX, end: u32::MAX },
                LineRange { start: 1, end: 1 },
            ]
        );
    }

    #[test]
    fn inverted_range_counts_one_line() {
        let entry: BlameEntry = serde_json::from_str(
            r#"{"author":"dev","time":1,"ranges":[{"start":9,"end":3},{"start":1,"end":2}]}"#,
        )
        .unwrap();
        assert_eq!(entry.line_count(), 3);
    }

    fn arb_ranges() -> impl Strategy<Value = Vec<LineRange>> {
        prop::collection::vec((1u32..500, 0u32..20), 0..30).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(start, len)| LineRange {
                    start,
                    end: start + len,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merging_is_idempotent(ranges in arb_ranges()) {
            let once = merge_ranges(&ranges);
            let twice = merge_ranges(&once);
            prop_assert_eq!(&once, &twice);
            for pair in once.windows(2) {
                prop_assert!(pair[1].start > pair[0].end + 1);
            }
        }
    }
}
