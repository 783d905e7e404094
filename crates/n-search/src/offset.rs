//! Search offsets — where the cursor lands relative to a match.
//!
//! | Offset      | Lands on                                        |
//! |-------------|-------------------------------------------------|
//! | (none)      | match start                                     |
//! | `N` `+N` `-N` `+` `-` | first non-blank of the line N below/above |
//! | `e` `e+N` `e-N` | last char of the match, N chars right/left  |
//! | `s` `b` `s+N` … | match start, N chars right/left             |
//! | `…;/pat` `…;?pat` | then search again from there              |
//!
//! Character offsets count line breaks like any other char and are clamped
//! to the buffer.

use tracing::debug;

use crate::buffer::TextBuffer;
use crate::error::SearchError;
use crate::pattern::{PatternState, SearchDirection};
use crate::position::{Position, Range};
use crate::search::{self, SearchEnv, SearchHit};

/// What an offset does to the match position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetKind {
    #[default]
    None,
    /// Lines below (negative: above) the match start.
    Line(isize),
    /// Chars right of the match's last char.
    End(isize),
    /// Chars right of the match start.
    Start(isize),
}

/// A parsed search offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOffset {
    pub kind: OffsetKind,
    /// A chained search, run from the offset position.
    pub chain: Option<(SearchDirection, String)>,
}

impl SearchOffset {
    /// Parse an offset. Text that is not an offset is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (kind, rest) = match text.chars().next() {
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => {
                let (n, rest) = signed_number(text);
                (OffsetKind::Line(n), rest)
            }
            Some('e') => {
                let (n, rest) = signed_number(&text[1..]);
                (OffsetKind::End(n), rest)
            }
            Some('s' | 'b') => {
                let (n, rest) = signed_number(&text[1..]);
                (OffsetKind::Start(n), rest)
            }
            _ => (OffsetKind::None, text),
        };

        let chain = rest.strip_prefix(';').and_then(|after| {
            let delim = after.chars().next()?;
            let dir = SearchDirection::from_delimiter(delim)?;
            let command = &after[delim.len_utf8()..];
            // `;/` alone repeats the last pattern.
            let command = if command.is_empty() {
                delim.to_string()
            } else {
                command.to_string()
            };
            Some((dir, command))
        });

        Self { kind, chain }
    }

    /// Position this offset selects for a match.
    #[must_use]
    pub fn resolve(&self, buf: &dyn TextBuffer, span: Range) -> Position {
        match self.kind {
            OffsetKind::None => span.start,
            OffsetKind::Line(n) => {
                let line = buf.normalize_line(signed(span.start.line).saturating_add(n));
                Position::new(line, buf.first_non_blank(line))
            }
            OffsetKind::End(n) => {
                let base = signed(buf.logical_to_offset(span.end)) - 1;
                char_position(buf, base.saturating_add(n))
            }
            OffsetKind::Start(n) => {
                let base = signed(buf.logical_to_offset(span.start));
                char_position(buf, base.saturating_add(n))
            }
        }
    }
}

/// Apply the offset text `offset` to `hit`, running any chained search.
///
/// A chained search is a full search: it updates the remembered pattern,
/// offset and direction.
///
/// # Errors
///
/// Errors from the chained search.
pub fn apply(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    offset: &str,
    hit: SearchHit,
) -> Result<SearchHit, SearchError> {
    let parsed = SearchOffset::parse(offset);
    let pos = parsed.resolve(env.buffer, hit.span);
    debug!(target: "search.offset", offset, kind = ?parsed.kind, ?pos, "resolved");

    match parsed.chain {
        Some((dir, command)) => {
            debug!(target: "search.offset", %command, ?dir, "chain");
            search::search(state, env, &command, pos, 1, dir)
        }
        None => Ok(SearchHit { pos, ..hit }),
    }
}

/// Parse `[+-]?digits`; a sign alone is ±1, nothing at all is 0. Returns the
/// number and the unparsed rest.
fn signed_number(text: &str) -> (isize, &str) {
    let (sign, body) = match text.chars().next() {
        Some('+') => (1, &text[1..]),
        Some('-') => (-1, &text[1..]),
        _ => (0, text),
    };
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &body[digits..];
    if digits == 0 {
        return (sign, rest);
    }
    let n = body[..digits].parse::<isize>().unwrap_or(isize::MAX);
    (if sign < 0 { -n } else { n }, rest)
}

fn char_position(buf: &dyn TextBuffer, offset: isize) -> Position {
    let last = signed(buf.file_size()).saturating_sub(1).max(0);
    let offset = usize::try_from(offset.clamp(0, last)).unwrap_or_default();
    buf.offset_to_logical(offset)
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
