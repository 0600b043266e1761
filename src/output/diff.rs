//! Unified diff rendering for fixed files

use std::path::Path;

/// Lines of unchanged context around each change
const CONTEXT: usize = 3;

/// Above this many cells the middle section is diffed as replace-all
const MAX_TABLE: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

struct Line<'a> {
    op: Op,
    text: &'a str,
    /// Lines of the original consumed before this one
    old_pos: usize,
    /// Lines of the modified text consumed before this one
    new_pos: usize,
}

/// Longest-common-subsequence edit script between two line slices
fn edit_script(a: &[&str], b: &[&str]) -> Vec<Op> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    let (n, m) = (a_mid.len(), b_mid.len());

    let mut ops = vec![Op::Equal; prefix];
    if n.saturating_mul(m) > MAX_TABLE {
        ops.extend(std::iter::repeat(Op::Delete).take(n));
        ops.extend(std::iter::repeat(Op::Insert).take(m));
    } else {
        // lcs[i * (m + 1) + j]: LCS length of a_mid[i..] and b_mid[j..]
        let width = m + 1;
        let mut lcs = vec![0u32; (n + 1) * width];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                lcs[i * width + j] = if a_mid[i] == b_mid[j] {
                    lcs[(i + 1) * width + j + 1] + 1
                } else {
                    lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
                };
            }
        }

        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if a_mid[i] == b_mid[j] {
                ops.push(Op::Equal);
                i += 1;
                j += 1;
            } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
                ops.push(Op::Delete);
                i += 1;
            } else {
                ops.push(Op::Insert);
                j += 1;
            }
        }
        ops.extend(std::iter::repeat(Op::Delete).take(n - i));
        ops.extend(std::iter::repeat(Op::Insert).take(m - j));
    }
    ops.extend(std::iter::repeat(Op::Equal).take(suffix));
    ops
}

fn annotate<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Line<'a>> {
    let (mut old_pos, mut new_pos) = (0, 0);
    edit_script(a, b)
        .into_iter()
        .map(|op| {
            let text = match op {
                Op::Equal | Op::Delete => a[old_pos],
                Op::Insert => b[new_pos],
            };
            let line = Line {
                op,
                text,
                old_pos,
                new_pos,
            };
            if op != Op::Insert {
                old_pos += 1;
            }
            if op != Op::Delete {
                new_pos += 1;
            }
            line
        })
        .collect()
}

/// Hunk header range: 1-based start and line count
fn range(start: usize, count: usize) -> String {
    if count == 0 {
        format!("{},0", start)
    } else {
        format!("{},{}", start + 1, count)
    }
}

/// Render a unified diff between `original` and `modified`.
/// Returns an empty string when the texts are line-for-line identical.
pub fn generate_unified_diff(file: &Path, original: &str, modified: &str) -> String {
    let original_lines: Vec<&str> = original.lines().collect();
    let modified_lines: Vec<&str> = modified.lines().collect();
    let lines = annotate(&original_lines, &modified_lines);

    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.op != Op::Equal)
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Group changes whose context windows touch
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &i in &changes {
        let start = i.saturating_sub(CONTEXT);
        let end = (i + CONTEXT + 1).min(lines.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    let mut diff = String::new();
    diff.push_str(&format!("--- a/{}\n", file.display()));
    diff.push_str(&format!("+++ b/{}\n", file.display()));

    for (start, end) in hunks {
        let hunk = &lines[start..end];
        let old_count = hunk.iter().filter(|l| l.op != Op::Insert).count();
        let new_count = hunk.iter().filter(|l| l.op != Op::Delete).count();
        diff.push_str(&format!(
            "@@ -{} +{} @@\n",
            range(hunk[0].old_pos, old_count),
            range(hunk[0].new_pos, new_count)
        ));
        for line in hunk {
            let marker = match line.op {
                Op::Equal => ' ',
                Op::Delete => '-',
                Op::Insert => '+',
            };
            diff.push(marker);
            diff.push_str(line.text);
            diff.push('\n');
        }
    }

    diff
}
