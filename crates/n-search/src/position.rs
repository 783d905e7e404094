//! Buffer coordinates: positions, match spans, and line ranges.
//!
//! All coordinates are **0-indexed**. Columns count Unicode scalar values
//! (chars), the same unit `ropey` indexes by, so a column can be turned into
//! a buffer offset without touching UTF-8 byte boundaries.
//!
//! Three shapes show up in the engine:
//!
//! - [`Position`] — a single `(line, col)` point (cursor, match start).
//! - [`Range`] — a half-open `[start, end)` span, used for match extents.
//! - [`LineRange`] — an inclusive `[start, end]` run of whole lines, the
//!   address of an ex command such as `:3,7s/a/b/`.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in a text buffer: (line, column), both 0-indexed.
///
/// Ordered lexicographically, line first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// Line 0, column 0.
    pub const ZERO: Self = Self { line: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for humans, matching Vim's `line:col`.
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A half-open span `[start, end)` in a buffer: the extent of a match.
///
/// A zero-width match (`/^`, `/x*`) has `start == end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a span. Panics in debug if `start > end`.
    #[inline]
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.line < end.line || (start.line == end.line && start.col <= end.col),
            "Range::new requires start <= end"
        );
        Self { start, end }
    }

    /// True when the span covers no characters.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.line == self.end.line && self.start.col == self.end.col
    }

    /// Number of lines the span touches. A single-line span returns 1.
    ///
    /// This is Vim's `nmatch`: anything above 1 means the match runs into
    /// the following lines.
    #[inline]
    #[must_use]
    pub const fn line_span(self) -> usize {
        self.end.line - self.start.line + 1
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Range({}:{} .. {}:{})",
            self.start.line, self.start.col, self.end.line, self.end.col
        )
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// LineRange
// ---------------------------------------------------------------------------

/// An inclusive run of lines `[start, end]`, the address of an ex command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Create a line range, swapping the ends if they arrive backwards
    /// (`:5,3s` is accepted the way Vim accepts it after its "Backwards
    /// range" prompt).
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// A range covering exactly one line.
    #[inline]
    #[must_use]
    pub const fn single(line: usize) -> Self {
        Self { start: line, end: line }
    }

    /// Clamp both ends into a buffer of `line_count` lines.
    #[must_use]
    pub fn normalized(self, line_count: usize) -> Self {
        let last = line_count.saturating_sub(1);
        Self::new(self.start.min(last), self.end.min(last))
    }

    /// Number of lines covered.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a line range covers at least one line.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start + 1, self.end + 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
