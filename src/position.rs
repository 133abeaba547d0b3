//! Source positions for diagnostics.
//!
//! The scanner and parser only track byte offsets; the host turns those into
//! line/column pairs when it prints a diagnostic.

use std::fmt;

/// A position in a script, both parts 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Locate `offset` in `source` by counting newlines before it. Offsets past
    /// the end are clamped to the end of the source.
    pub fn from_offset(source: &[u8], offset: usize) -> Position {
        let before = &source[..offset.min(source.len())];
        match before.iter().rposition(|&b| b == b'\n') {
            Some(nl) => Position::new(
                before.iter().filter(|&&b| b == b'\n').count() + 1,
                before.len() - nl,
            ),
            None => Position::new(1, before.len() + 1),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
