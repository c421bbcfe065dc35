//! Regrouping of a file's block sequence into bounded change groups.

use jitmine_core::Hunk;

/// Split `content` into change groups with at most `surrounding` lines of
/// leading and trailing context.
///
/// Each group opens with the tail of the context block that precedes its
/// first change and closes with the head of the context block that follows
/// its last change. Context blocks of at most `surrounding` lines between
/// two changes stay inside the group. Blocks are cloned; the input is left
/// untouched.
///
/// # Examples
///
/// ```
/// use jitmine_core::Hunk;
/// use jitmine_difflens::hunks::regroup;
///
/// let lines = |r: std::ops::Range<u32>| r.map(|i| i.to_string()).collect::<Vec<_>>();
/// let content = vec![
///     Hunk::context(lines(0..10)),
///     Hunk::change(vec!["old".into()], vec!["new".into()]),
///     Hunk::context(lines(10..20)),
/// ];
/// let groups = regroup(&content, 3);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0][0].ab, vec!["7", "8", "9"]);
/// assert_eq!(groups[0][2].ab, vec!["10", "11", "12"]);
/// ```
pub fn regroup(content: &[Hunk], surrounding: usize) -> Vec<Vec<Hunk>> {
    let mut groups = Vec::new();
    let mut leading: Option<Hunk> = None;
    let mut pending: Vec<Hunk> = Vec::new();

    for block in content {
        if block.is_change() {
            pending.push(block.clone());
            continue;
        }
        if block.ab.is_empty() {
            continue;
        }
        if pending.is_empty() {
            leading = tail(block, surrounding);
        } else if block.ab.len() <= surrounding {
            pending.push(block.clone());
        } else {
            let mut group: Vec<Hunk> = leading.take().into_iter().collect();
            group.append(&mut pending);
            group.extend(head(block, surrounding));
            groups.push(group);
            leading = tail(block, surrounding);
        }
    }

    if !pending.is_empty() {
        let mut group: Vec<Hunk> = leading.into_iter().collect();
        group.append(&mut pending);
        groups.push(group);
    }
    groups
}

fn head(block: &Hunk, n: usize) -> Option<Hunk> {
    (n > 0).then(|| Hunk::context(block.ab.iter().take(n).cloned().collect()))
}

fn tail(block: &Hunk, n: usize) -> Option<Hunk> {
    let skip = block.ab.len().saturating_sub(n);
    (n > 0).then(|| Hunk::context(block.ab[skip..].to_vec()))
}
