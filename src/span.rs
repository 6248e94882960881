//! Source position tracking shared by the lexer, parser and printer.

use std::fmt;
use std::ops::Range;

use text_size::{TextRange, TextSize};

/// A byte range into the original source text.
///
/// Wraps [`TextRange`] from the `text-size` crate (the same crate the
/// teacher uses for its `rowan`-based spans) so every AST node and lexeme
/// can carry a cheap, `Copy` position without dragging in a full CST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    range: TextRange,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            range: TextRange::new(TextSize::from(start), TextSize::from(end)),
        }
    }

    pub fn start(self) -> u32 {
        self.range.start().into()
    }

    pub fn end(self) -> u32 {
        self.range.end().into()
    }

    /// Returns the smallest span containing both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Self {
            range: self.range.cover(other.range),
        }
    }

    pub fn contains(self, other: Span) -> bool {
        self.range.contains_range(other.range)
    }

    pub fn as_range(self) -> Range<usize> {
        self.start() as usize..self.end() as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start(), self.end())
    }
}

/// Human-facing line/column, lazily computed from a byte offset.
///
/// Kept separate from [`Span`] the way the teacher's legacy `parser::Span`
/// (line, column) was distinct from the byte-offset ranges used by the
/// token stream: diagnostics want line/column, everything else wants
/// cheap byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = offset as usize;
        let mut line = 1u32;
        let mut last_newline = 0usize;

        for (idx, ch) in source.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                last_newline = idx + 1;
            }
        }

        let column = source[last_newline..offset.min(source.len())]
            .chars()
            .count() as u32
            + 1;

        Self { line, column }
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
