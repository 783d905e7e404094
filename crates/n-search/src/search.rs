//! Search — `/`, `?`, `n`, `N`, `*`, `#`.
//!
//! # Search flow
//!
//! 1. [`parse_search_command`] splits the command text into a pattern and an
//!    offset (`foo/e+1` → `foo`, `e+1`). An empty pattern means "the last
//!    search".
//! 2. The pattern is compiled; only then is [`PatternState`] updated.
//! 3. [`find_matches`] scans line by line from the start position, once per
//!    count, wrapping around the buffer when `wrapscan` is set.
//! 4. The offset is applied to the final match ([`crate::offset`]), which may
//!    chain into another search (`/foo/;/bar`).
//!
//! # Start position rules
//!
//! A forward search never returns a match that starts at the cursor, so `n`
//! always moves. A backward search from column 0 starts on the previous line.
//! In the wrapped pass both rules are dropped: the only match in the buffer
//! is found again from itself.

use tracing::{debug, trace};

use crate::buffer::TextBuffer;
use crate::error::SearchError;
use crate::offset;
use crate::options::OptionSource;
use crate::pattern::{PatternState, SearchDirection};
use crate::position::{Position, Range};
use crate::regexp::{self, Regexp};

// ---------------------------------------------------------------------------
// Environment and results
// ---------------------------------------------------------------------------

/// The collaborators a search reads: the text and the options.
#[derive(Clone, Copy)]
pub struct SearchEnv<'a> {
    pub buffer: &'a dyn TextBuffer,
    pub options: &'a dyn OptionSource,
}

impl<'a> SearchEnv<'a> {
    #[must_use]
    pub fn new(buffer: &'a dyn TextBuffer, options: &'a dyn OptionSource) -> Self {
        Self { buffer, options }
    }

    pub(crate) fn magic(&self) -> bool {
        self.options.is_set("magic")
    }

    /// Compile `pattern` with the case mode resolved against the options.
    pub(crate) fn compile(&self, pattern: &str, case: CaseMode) -> Result<Regexp, SearchError> {
        Regexp::compile(pattern, self.magic(), ignore_case_for(pattern, self.options, case))
    }
}

/// A successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    /// Where the cursor goes, offset applied.
    pub pos: Position,
    /// The match itself.
    pub span: Range,
    /// True if the scan ran past the end of the buffer and continued from the
    /// other end.
    pub wrapped: bool,
}

/// How case sensitivity is decided for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// `ignorecase`, overridden by `smartcase` for patterns with uppercase.
    #[default]
    Options,
    /// `ignorecase` only (`*`, `#` and `:s`).
    NoSmartcase,
    /// Ignore case regardless of options (`:s///i`).
    Ignore,
    /// Match case regardless of options (`:s///I`).
    Match,
}

/// Whether `pattern` is matched ignoring case.
#[must_use]
pub fn ignore_case_for(pattern: &str, options: &dyn OptionSource, case: CaseMode) -> bool {
    match case {
        CaseMode::Ignore => true,
        CaseMode::Match => false,
        CaseMode::NoSmartcase => options.is_set("ignorecase"),
        CaseMode::Options => {
            options.is_set("ignorecase")
                && !(options.is_set("smartcase") && regexp::has_uppercase(pattern))
        }
    }
}

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// A parsed `/` or `?` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCommand {
    /// `None` reuses the last search pattern.
    pub pattern: Option<String>,
    /// `None` reuses the last offset.
    pub offset: Option<String>,
}

/// Split the text typed after `/` or `?` into pattern and offset.
///
/// | Text        | Pattern      | Offset      |
/// |-------------|--------------|-------------|
/// | `` (empty)  | last         | last        |
/// | `/e`        | last         | `e`         |
/// | `foo`       | `foo`        | none        |
/// | `foo/e+1`   | `foo`        | `e+1`       |
/// | `a\/b/`     | `a\/b`       | none        |
///
/// For `?` searches `\?` is unescaped, so it stays a literal `?`.
#[must_use]
pub fn parse_search_command(text: &str, dir: SearchDirection, magic: bool) -> SearchCommand {
    let delim = dir.delimiter();
    if text.is_empty() {
        return SearchCommand {
            pattern: None,
            offset: None,
        };
    }
    if let Some(rest) = text.strip_prefix(delim) {
        return SearchCommand {
            pattern: None,
            offset: Some(rest.to_string()),
        };
    }

    let end = skip_regexp(text, 0, delim, magic);
    let mut pattern = text[..end].to_string();
    if delim == '?' {
        pattern = pattern.replace("\\?", "?");
    }
    let offset = text.get(end + delim.len_utf8()..).unwrap_or("");
    SearchCommand {
        pattern: Some(pattern),
        offset: Some(offset.to_string()),
    }
}

/// Byte index of the first unescaped `delim` at or after `start`, or
/// `text.len()` if there is none. `[...]` collections are skipped whole, so
/// `/[/]/` is one pattern.
#[must_use]
pub fn skip_regexp(text: &str, start: usize, delim: char, magic: bool) -> usize {
    let mut i = start;
    while let Some(c) = text[i..].chars().next() {
        if c == delim {
            return i;
        }
        match c {
            '[' if magic => {
                if let Some(close) = collection_end(text, i + 1) {
                    i = close + 1;
                    continue;
                }
            }
            '\\' => {
                if let Some(next) = text[i + 1..].chars().next() {
                    if next == '[' && !magic {
                        if let Some(close) = collection_end(text, i + 2) {
                            i = close + 1;
                            continue;
                        }
                    }
                    i += 1 + next.len_utf8();
                    continue;
                }
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    text.len()
}

/// Index of the `]` closing a collection whose body starts at `start`.
fn collection_end(text: &str, start: usize) -> Option<usize> {
    let mut i = start;
    if text[i..].starts_with('^') {
        i += 1;
    }
    if text[i..].starts_with(']') {
        i += 1;
    }
    while let Some(c) = text[i..].chars().next() {
        match c {
            ']' => return Some(i),
            '\\' => {
                i += 1;
                if let Some(next) = text[i..].chars().next() {
                    i += next.len_utf8();
                }
            }
            _ => i += c.len_utf8(),
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a `/` or `?` command from `start`.
///
/// `command` is the text after the `/` or `?`. On success the pattern,
/// offset and direction are remembered for `n`, `N` and `:s`.
///
/// # Errors
///
/// - [`SearchError::NoPreviousPattern`] for an empty pattern with no history.
/// - [`SearchError::PatternCompile`] for a bad pattern (state untouched).
/// - A not-found error ([`SearchError::is_not_found`]).
pub fn search(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    command: &str,
    start: Position,
    count: usize,
    dir: SearchDirection,
) -> Result<SearchHit, SearchError> {
    let parsed = parse_search_command(command, dir, env.magic());
    let pattern = match parsed.pattern {
        Some(p) => p,
        None => state
            .last_search()
            .ok_or(SearchError::NoPreviousPattern)?
            .to_string(),
    };
    let offset = parsed
        .offset
        .unwrap_or_else(|| state.last_offset().to_string());
    debug!(target: "search.parse", %pattern, %offset, ?dir, count, "search");

    let re = env.compile(&pattern, CaseMode::Options)?;
    state.record_search(&pattern, &offset, dir);

    let hit = find_compiled(env, &re, start, dir, count)?;
    offset::apply(state, env, &offset, hit)
}

/// `n`: repeat the last search in its own direction.
///
/// # Errors
///
/// As [`search`]; [`SearchError::NoPreviousPattern`] if nothing was searched.
pub fn search_next(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    start: Position,
    count: usize,
) -> Result<SearchHit, SearchError> {
    let dir = state.last_direction();
    repeat_last(state, env, start, count, dir)
}

/// `N`: repeat the last search in the opposite direction. The remembered
/// direction is not changed.
///
/// # Errors
///
/// As [`search_next`].
pub fn search_previous(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    start: Position,
    count: usize,
) -> Result<SearchHit, SearchError> {
    let dir = state.last_direction().opposite();
    repeat_last(state, env, start, count, dir)
}

fn repeat_last(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    start: Position,
    count: usize,
    dir: SearchDirection,
) -> Result<SearchHit, SearchError> {
    let pattern = state
        .last_search()
        .ok_or(SearchError::NoPreviousPattern)?
        .to_string();
    let offset = state.last_offset().to_string();
    let re = env.compile(&pattern, CaseMode::Options)?;
    let hit = find_compiled(env, &re, start, dir, count)?;
    offset::apply(state, env, &offset, hit)
}

/// `*` / `#` (`whole_word`) and `g*` / `g#`: search for the word under or
/// after the cursor.
///
/// The word is matched literally; `smartcase` does not apply.
///
/// # Errors
///
/// [`SearchError::NoStringUnderCursor`] when the cursor line has nothing to
/// search for at or after the cursor, or a not-found error.
pub fn search_word(
    state: &mut PatternState,
    env: SearchEnv<'_>,
    cursor: Position,
    count: usize,
    whole_word: bool,
    dir: SearchDirection,
) -> Result<SearchHit, SearchError> {
    let line = env.buffer.line_text(cursor.line);
    let (start_col, word, keyword) =
        word_at(&line, cursor.col).ok_or(SearchError::NoStringUnderCursor)?;

    let escaped = regexp::escape_magic(&word);
    let pattern = if whole_word && keyword {
        format!("\\<{escaped}\\>")
    } else {
        escaped
    };
    debug!(target: "search.parse", %pattern, ?dir, count, "search_word");

    let re = env.compile(&pattern, CaseMode::NoSmartcase)?;
    state.record_search(&pattern, "", dir);

    let from = Position::new(cursor.line, start_col);
    find_compiled(env, &re, from, dir, count)
}

/// Find the `count`th match of `pattern` from `start` without touching any
/// remembered state.
///
/// # Errors
///
/// [`SearchError::PatternCompile`] or a not-found error.
pub fn find_matches(
    env: SearchEnv<'_>,
    pattern: &str,
    start: Position,
    dir: SearchDirection,
    count: usize,
    case: CaseMode,
) -> Result<SearchHit, SearchError> {
    let re = env.compile(pattern, case)?;
    find_compiled(env, &re, start, dir, count)
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

pub(crate) fn find_compiled(
    env: SearchEnv<'_>,
    re: &Regexp,
    start: Position,
    dir: SearchDirection,
    count: usize,
) -> Result<SearchHit, SearchError> {
    let wrapscan = env.options.is_set("wrapscan");
    let not_found = || {
        debug!(target: "search.find", pattern = re.pattern(), ?dir, wrapscan, "not_found");
        let pattern = re.pattern().to_string();
        if wrapscan {
            SearchError::PatternNotFound(pattern)
        } else if dir == SearchDirection::Forward {
            SearchError::HitBottom(pattern)
        } else {
            SearchError::HitTop(pattern)
        }
    };

    let (mut span, mut wrapped) =
        find_once(env.buffer, re, start, dir, wrapscan).ok_or_else(not_found)?;
    for _ in 1..count {
        let (next, w) =
            find_once(env.buffer, re, span.start, dir, wrapscan).ok_or_else(not_found)?;
        span = next;
        wrapped |= w;
    }

    trace!(target: "search.find", pattern = re.pattern(), ?span, wrapped, "found");
    Ok(SearchHit {
        pos: span.start,
        span,
        wrapped,
    })
}

/// One repetition of the scan. Returns the match and whether it was found in
/// the wrapped pass.
fn find_once(
    buf: &dyn TextBuffer,
    re: &Regexp,
    start: Position,
    dir: SearchDirection,
    wrapscan: bool,
) -> Option<(Range, bool)> {
    let line_count = signed(buf.line_count());
    let start_line = signed(start.line.min(buf.line_count().saturating_sub(1)));
    let mut lnum = start_line;
    let mut at_first_line = true;
    if dir == SearchDirection::Backward && start.col == 0 {
        lnum -= 1;
        at_first_line = false;
    }

    for pass in 0..2 {
        while (0..line_count).contains(&lnum) {
            let line = usize::try_from(lnum).unwrap_or_default();
            let limit = at_first_line.then_some(start.col);
            let hit = match dir {
                SearchDirection::Forward => match_after(buf, re, line, limit),
                SearchDirection::Backward => match_before(buf, re, line, limit),
            };
            if let Some(span) = hit {
                return Some((span, pass == 1));
            }
            at_first_line = false;
            if pass == 1 && lnum == start_line {
                return None;
            }
            lnum += dir.step();
        }

        at_first_line = false;
        if !wrapscan {
            break;
        }
        lnum = match dir {
            SearchDirection::Forward => 0,
            SearchDirection::Backward => line_count - 1,
        };
        trace!(target: "search.find", ?dir, "wrap");
    }
    None
}

/// First match on `line`; with `after`, the first one that starts past that
/// column.
fn match_after(buf: &dyn TextBuffer, re: &Regexp, line: usize, after: Option<usize>) -> Option<Range> {
    let mut m = re.exec_multi(buf, line, 0)?;
    let Some(col) = after else {
        return Some(m.span);
    };
    let len = buf.line_length(line);

    // A match at the end of the line counts as one column earlier, so a
    // cursor on the last char still moves past a `$` match.
    while signed(m.start().col) - isize::from(m.start().col == len) < signed(col) + 1 {
        if m.nmatch() > 1 {
            return None;
        }
        let next = next_column(&m.span, len);
        if next >= len {
            return None;
        }
        m = re.exec_multi(buf, line, next)?;
    }
    Some(m.span)
}

/// Last match on `line`; with `before`, the last one that starts before that
/// column.
fn match_before(buf: &dyn TextBuffer, re: &Regexp, line: usize, before: Option<usize>) -> Option<Range> {
    let mut m = re.exec_multi(buf, line, 0)?;
    let len = buf.line_length(line);
    let mut best = None;
    loop {
        if before.is_some_and(|col| m.start().col >= col) {
            break;
        }
        best = Some(m.span);
        if m.nmatch() > 1 {
            break;
        }
        let next = next_column(&m.span, len);
        if next >= len {
            break;
        }
        match re.exec_multi(buf, line, next) {
            Some(n) => m = n,
            None => break,
        }
    }
    best
}

/// Column to retry from after a single-line match: its end, or one further
/// for a zero-width match.
fn next_column(span: &Range, len: usize) -> usize {
    let end = span.end.col;
    if end == span.start.col && end < len {
        end + 1
    } else {
        end
    }
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Word under cursor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Keyword,
    Punctuation,
    Blank,
}

fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Keyword
    } else {
        CharClass::Punctuation
    }
}

/// The word `*` searches for: the keyword under or after `col`, else the run
/// of punctuation under or after it. Returns its start column, its text and
/// whether it is a keyword.
fn word_at(line: &str, col: usize) -> Option<(usize, String, bool)> {
    let chars: Vec<char> = line.chars().collect();
    let run = |class: CharClass| -> Option<(usize, usize)> {
        let mut start = col.min(chars.len());
        if start < chars.len() && classify(chars[start]) == class {
            while start > 0 && classify(chars[start - 1]) == class {
                start -= 1;
            }
        } else {
            while start < chars.len() && classify(chars[start]) != class {
                start += 1;
            }
            if start == chars.len() {
                return None;
            }
        }
        let mut end = start;
        while end < chars.len() && classify(chars[end]) == class {
            end += 1;
        }
        Some((start, end))
    };

    let (keyword, (start, end)) = run(CharClass::Keyword)
        .map(|r| (true, r))
        .or_else(|| run(CharClass::Punctuation).map(|r| (false, r)))?;
    Some((start, chars[start..end].iter().collect(), keyword))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
