//! Source spans and line mapping.
//!
//! This module provides [`TextSpan`], a half-open byte range into source
//! text, and [`LineIndex`] for converting byte offsets into the 1-based
//! line/column positions shown to users.

use serde::Serialize;

/// A half-open `[start, end)` byte range into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct TextSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl TextSpan {
    /// Create a span covering `[start, end)`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self { start, end }
    }

    /// Create a zero-width span at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is zero-width.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the span.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains_span(&self, other: TextSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether two spans conflict when used as edit targets.
    ///
    /// Non-empty spans overlap when they share at least one byte. A
    /// zero-width span overlaps a non-empty one when it sits at or inside its
    /// start, and two zero-width spans overlap when they sit at the same
    /// offset (their relative order would be ambiguous).
    pub fn overlaps(&self, other: TextSpan) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start <= self.start && self.start < other.end,
            (false, true) => self.start <= other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Smallest span covering both spans.
    pub fn cover(&self, other: TextSpan) -> TextSpan {
        TextSpan::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for TextSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Byte column (1-indexed).
    pub column: usize,
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the index for `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        Position {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }

    /// Byte offset of a 1-based position, if it exists.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let start = *self.line_starts.get(position.line.checked_sub(1)?)?;
        let offset = start + position.column.checked_sub(1)?;
        (offset <= self.len).then_some(offset)
    }

    /// Byte offset where the line containing `offset` starts.
    pub fn line_start(&self, offset: usize) -> usize {
        let line = self.position(offset).line;
        self.line_starts[line - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_non_empty_spans() {
        let a = TextSpan::new(0, 5);
        assert!(a.overlaps(TextSpan::new(4, 8)));
        assert!(!a.overlaps(TextSpan::new(5, 8)));
        assert!(a.overlaps(TextSpan::new(1, 2)));
    }

    #[test]
    fn zero_width_spans_overlap_at_same_offset() {
        assert!(TextSpan::empty(3).overlaps(TextSpan::empty(3)));
        assert!(!TextSpan::empty(3).overlaps(TextSpan::empty(4)));
    }

    #[test]
    fn insertion_at_end_of_replacement_is_disjoint() {
        let replaced = TextSpan::new(2, 6);
        assert!(replaced.overlaps(TextSpan::empty(2)));
        assert!(replaced.overlaps(TextSpan::empty(4)));
        assert!(!replaced.overlaps(TextSpan::empty(6)));
    }

    #[test]
    fn cover_and_contains() {
        let span = TextSpan::new(3, 5).cover(TextSpan::new(8, 9));
        assert_eq!(span, TextSpan::new(3, 9));
        assert!(span.contains_span(TextSpan::new(4, 9)));
        assert!(!span.contains(9));
    }

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("ab\ncde\n\nf");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.position(0), Position { line: 1, column: 1 });
        assert_eq!(index.position(4), Position { line: 2, column: 2 });
        assert_eq!(index.position(7), Position { line: 3, column: 1 });
        assert_eq!(index.position(8), Position { line: 4, column: 1 });
        assert_eq!(index.offset(Position { line: 2, column: 2 }), Some(4));
        assert_eq!(index.offset(Position { line: 9, column: 1 }), None);
        assert_eq!(index.line_start(5), 3);
    }
}
