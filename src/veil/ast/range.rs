//! Position and location tracking for source code locations
//!
//! ## Types
//!
//! - [`Position`] - A line:column position in source code, both 1-based
//! - [`Range`] - A source code range with start/end positions and byte span
//! - [`SourceLocation`] - Utility for converting byte offsets to positions
//!
//! The lexer produces byte spans, converts them once with [`SourceLocation`], and every token
//! and AST node afterwards carries a full [`Range`]. Nodes synthesized by transform steps have
//! no source text and carry `Range::default()`.

use serde::Serialize;
use std::fmt;
use std::ops::Range as ByteRange;

/// A position in source code. Lines and columns start at 1, columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
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

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A location in source code (byte span plus start and end positions)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// The smallest range covering both `self` and `other`.
    pub fn to(&self, other: &Range) -> Range {
        let (start, span_start) = if other.span.start < self.span.start {
            (other.start, other.span.start)
        } else {
            (self.start, self.span.start)
        };
        let (end, span_end) = if other.span.end > self.span.end {
            (other.end, other.span.end)
        } else {
            (self.end, self.span.end)
        };
        Range::new(span_start..span_end, start, end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::new(0..0, Position::default(), Position::default())
    }
}

/// Provides fast conversion from byte offsets to line/column positions
pub struct SourceLocation {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceLocation {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];

        for (byte_pos, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(byte_pos + 1);
            }
        }

        Self { line_starts }
    }

    /// Convert a byte offset to a line/column position
    pub fn byte_to_position(&self, byte_offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);

        Position::new(line + 1, byte_offset - line_start + 1)
    }

    /// Convert a byte range to a location
    pub fn byte_range_to_range(&self, range: &ByteRange<usize>) -> Range {
        Range::new(
            range.clone(),
            self.byte_to_position(range.start),
            self.byte_to_position(range.end),
        )
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        assert_eq!(format!("{}", Position::new(5, 10)), "5:10");
    }

    #[test]
    fn test_byte_to_position_multiline() {
        let loc = SourceLocation::new("local x\nprint(x)\n");

        assert_eq!(loc.byte_to_position(0), Position::new(1, 1));
        assert_eq!(loc.byte_to_position(6), Position::new(1, 7));
        assert_eq!(loc.byte_to_position(8), Position::new(2, 1));
        assert_eq!(loc.byte_to_position(14), Position::new(2, 7));
        assert_eq!(loc.line_count(), 3);
    }

    #[test]
    fn test_range_to_covers_both() {
        let loc = SourceLocation::new("a = b + c");
        let left = loc.byte_range_to_range(&(4..5));
        let right = loc.byte_range_to_range(&(8..9));

        let joined = left.to(&right);
        assert_eq!(joined.span, 4..9);
        assert_eq!(joined.start, Position::new(1, 5));
        assert_eq!(joined.end, Position::new(1, 10));
        assert_eq!(right.to(&left), joined);
    }
}
