//! Source location tracking.

use std::ops::Range;

/// A byte span in one source text, with the zero-based line it starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}
