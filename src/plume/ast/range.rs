//! Position and range tracking for source locations.
//!
//! Every token and syntax node carries a [`Range`]: the byte span of its
//! source text plus start/end line:column positions. [`SourceLocation`]
//! converts byte offsets to positions with an O(log n) binary search over
//! precomputed line starts.
//!
//! Lines and columns are 0-indexed internally; the diagnostic renderer
//! adds 1 for display. Columns count characters, not bytes, so annotation
//! carets line up even on multi-byte source text.

use std::fmt;
use std::ops::Range as ByteRange;

/// A line:column position in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range: byte span plus start and end positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            span: 0..0,
            start: Position::default(),
            end: Position::default(),
        }
    }
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// True when the range starts and ends on the same line.
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Merge two ranges into the smallest range covering both.
    pub fn cover(&self, other: &Range) -> Range {
        let span = self.span.start.min(other.span.start)..self.span.end.max(other.span.end);
        let start = if self.start <= other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end >= other.end { self.end } else { other.end };
        Range::new(span, start, end)
    }

    /// Build a bounding box that contains all provided ranges.
    pub fn bounding_box<'a, I>(mut ranges: I) -> Option<Range>
    where
        I: Iterator<Item = &'a Range>,
    {
        let first = ranges.next()?.clone();
        Some(ranges.fold(first, |acc, r| acc.cover(r)))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Converts byte offsets to line:column positions for one source buffer.
#[derive(Debug)]
pub struct SourceLocation<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceLocation<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// The 0-indexed line containing the byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert - 1,
        }
    }

    /// Convert a byte offset to a position. Columns count characters from
    /// the start of the line.
    pub fn position_of(&self, offset: usize) -> Position {
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        let offset = offset.min(self.source.len());
        let column = self.source[line_start..offset].chars().count();
        Position::new(line, column)
    }

    /// Convert a byte range to a [`Range`].
    pub fn range_of(&self, span: &ByteRange<usize>) -> Range {
        Range::new(
            span.clone(),
            self.position_of(span.start),
            self.position_of(span.end),
        )
    }

    /// The text of a 0-indexed line, without its trailing newline.
    pub fn line_text(&self, line: usize) -> &'a str {
        let start = match self.line_starts.get(line) {
            Some(&s) => s,
            None => return "",
        };
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&e| e - 1)
            .unwrap_or(self.source.len());
        &self.source[start..end]
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_of_first_line() {
        let loc = SourceLocation::new("abc\ndef\n");
        assert_eq!(loc.position_of(0), Position::new(0, 0));
        assert_eq!(loc.position_of(2), Position::new(0, 2));
    }

    #[test]
    fn test_position_of_later_lines() {
        let loc = SourceLocation::new("abc\ndef\nghi");
        assert_eq!(loc.position_of(4), Position::new(1, 0));
        assert_eq!(loc.position_of(9), Position::new(2, 1));
    }

    #[test]
    fn test_columns_count_chars_not_bytes() {
        let loc = SourceLocation::new("é = 1");
        // 'é' is two bytes; '=' starts at byte 3 but column 2.
        assert_eq!(loc.position_of(3), Position::new(0, 2));
    }

    #[test]
    fn test_line_text() {
        let loc = SourceLocation::new("abc\ndef\nghi");
        assert_eq!(loc.line_text(0), "abc");
        assert_eq!(loc.line_text(1), "def");
        assert_eq!(loc.line_text(2), "ghi");
        assert_eq!(loc.line_text(3), "");
    }

    #[test]
    fn test_cover() {
        let a = Range::new(0..3, Position::new(0, 0), Position::new(0, 3));
        let b = Range::new(5..8, Position::new(1, 0), Position::new(1, 3));
        let c = a.cover(&b);
        assert_eq!(c.span, 0..8);
        assert_eq!(c.start, Position::new(0, 0));
        assert_eq!(c.end, Position::new(1, 3));
    }
}
