//! Source spans and line/column mapping

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range `[start, start + len)` in source text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TextSpan {
    /// Start offset in bytes
    pub start: usize,
    /// Length in bytes
    pub len: usize,
}

impl TextSpan {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &TextSpan) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }

    /// Whether the spans share at least one byte
    pub fn overlaps(&self, other: &TextSpan) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Two edit targets conflict when they overlap or one contains the other.
    /// Adjacent non-empty spans do not conflict.
    pub fn conflicts_with(&self, other: &TextSpan) -> bool {
        self.overlaps(other) || self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// Maps byte offsets to 1-based line/column pairs
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    /// Offset of the first byte of each line
    line_starts: Vec<usize>,
    text: String,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            text: text.to_string(),
        }
    }

    /// 1-based line and column (in characters) of `offset`
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        (line + 1, column + 1)
    }

    /// Source line by 1-based number, without its newline
    pub fn line(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len());
        self.text
            .get(start..end)
            .map(|l| l.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bounds() {
        let span = TextSpan::from_bounds(3, 8);
        assert_eq!(span.len, 5);
        assert_eq!(span.end(), 8);
        assert_eq!(format!("{}", span), "3..8");
    }

    #[test]
    fn test_span_conflicts() {
        let a = TextSpan::new(0, 5);
        let b = TextSpan::new(5, 3);
        let c = TextSpan::new(2, 1);
        let d = TextSpan::new(4, 4);

        // Adjacent spans are fine
        assert!(!a.conflicts_with(&b));
        // Containment
        assert!(a.conflicts_with(&c));
        assert!(c.conflicts_with(&a));
        // Partial overlap
        assert!(a.conflicts_with(&d));
        assert!(d.conflicts_with(&b));
    }

    #[test]
    fn test_empty_span_conflicts() {
        let empty = TextSpan::new(2, 0);
        assert!(TextSpan::new(0, 5).conflicts_with(&empty));
        assert!(empty.conflicts_with(&TextSpan::new(2, 0)));
        assert!(!empty.conflicts_with(&TextSpan::new(3, 2)));
    }

    #[test]
    fn test_line_col() {
        let index = LineIndex::new("ab\ncd\n\nxyz");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(1), (1, 2));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(7), (4, 1));
        assert_eq!(index.line_col(9), (4, 3));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_line_text() {
        let index = LineIndex::new("first\r\nsecond\nthird");
        assert_eq!(index.line(1), Some("first"));
        assert_eq!(index.line(2), Some("second"));
        assert_eq!(index.line(3), Some("third"));
        assert_eq!(index.line(0), None);
        assert_eq!(index.line(4), None);
    }
}
