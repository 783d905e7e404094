//! Vim patterns on top of the `regex` crate.
//!
//! Searches and substitutions speak Vim's pattern dialect (`\(..\)`,
//! `\<word\>`, `\{2,3}`); the matching itself is done by [`regex`]. This
//! module owns the three matcher capabilities the engine needs:
//!
//! - [`Regexp::compile`] — translate a Vim pattern and build the regex.
//! - [`Regexp::exec_multi`] — find the first match that *starts* on a given
//!   line at or after a column; it may run into later lines.
//! - [`Regexp::expand`] — expand a `:s` replacement template against a match.
//!
//! # Supported pattern items
//!
//! | Vim (magic)        | Meaning                         |
//! |--------------------|---------------------------------|
//! | `^` `$` `.` `*`    | anchors, any char, repeat       |
//! | `\(` `\)` `\|`     | group, alternation              |
//! | `\+` `\=` `\?`     | one-or-more, optional           |
//! | `\{n,m}` `\{-n,m}` | counted repeat (greedy / lazy)  |
//! | `\<` `\>`          | start / end of word             |
//! | `[...]` `[^...]`   | collections (no newline)        |
//! | `\s \d \w \a \l \u \x \h \o` (and uppercase negations) | classes |
//! | `\_s` `\_.` `\_[...]` `\n` | the same, newline included |
//! | `\c` `\C`          | ignore / match case             |
//! | `\m` `\M`          | magic / nomagic for the rest    |
//!
//! Back-references, look-around (`\@`), `\zs`/`\ze` and `\%` items are
//! rejected at compile time rather than silently mismatching.

use std::cell::RefCell;
use std::fmt;

use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, trace};

use crate::buffer::TextBuffer;
use crate::error::SearchError;
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// MatchResult
// ---------------------------------------------------------------------------

/// A successful match: where it lies and what each group captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Extent of the whole match, absolute buffer coordinates.
    pub span: Range,
    groups: Vec<Option<String>>,
}

impl MatchResult {
    /// Number of lines the match touches (Vim's `nmatch`, at least 1).
    #[inline]
    #[must_use]
    pub const fn nmatch(&self) -> usize {
        self.span.line_span()
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> Position {
        self.span.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> Position {
        self.span.end
    }

    /// Text of group `n` (0 is the whole match). Empty if it did not take part.
    #[must_use]
    pub fn group(&self, n: usize) -> &str {
        self.groups
            .get(n)
            .and_then(Option::as_deref)
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Regexp
// ---------------------------------------------------------------------------

/// How far past its first line a match can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// Never crosses a line break.
    Line,
    /// Crosses at most this many line breaks.
    Lines(usize),
    /// A line-break item is repeated: no limit.
    Buffer,
}

/// A compiled Vim pattern.
#[derive(Debug, Clone)]
pub struct Regexp {
    re: Regex,
    source: String,
    magic: bool,
    reach: Reach,
    flat: RefCell<Option<Flattened>>,
}

impl Regexp {
    /// Compile a Vim pattern.
    ///
    /// `ignore_case` is the case mode decided by the caller (options, `:s`
    /// flags); a `\c` or `\C` inside the pattern overrides it.
    ///
    /// # Errors
    ///
    /// [`SearchError::PatternCompile`] for unsupported items and for anything
    /// the regex engine rejects.
    pub fn compile(pattern: &str, magic: bool, ignore_case: bool) -> Result<Self, SearchError> {
        let fail = |reason: String| SearchError::PatternCompile {
            pattern: pattern.to_string(),
            reason,
        };
        let tr = translate(pattern, magic).map_err(fail)?;
        let ignore_case = tr.ignore_case.unwrap_or(ignore_case);
        let re = RegexBuilder::new(&tr.regex)
            .case_insensitive(ignore_case)
            .multi_line(true)
            .crlf(true)
            .build()
            .map_err(|e| fail(e.to_string()))?;
        debug!(
            target: "regexp.compile",
            pattern,
            regex = %tr.regex,
            ignore_case,
            reach = ?tr.reach(),
            "compiled"
        );
        Ok(Self {
            re,
            source: pattern.to_string(),
            magic,
            reach: tr.reach(),
            flat: RefCell::new(None),
        })
    }

    /// The Vim pattern this was compiled from.
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// True when the pattern can match a line break.
    #[inline]
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        !matches!(self.reach, Reach::Line)
    }

    /// Find the first match starting on `line` at or after char column `col`.
    ///
    /// The match may end on a later line when the pattern can match line
    /// breaks. `col` may equal the line length (so `$` and empty patterns can
    /// match at the end of a line); beyond that there is no match.
    ///
    /// Only the lines a match can reach are read. A pattern with a repeated
    /// line-break item may run to the end of the buffer; for those the text
    /// is flattened once per buffer revision and the last scan is reused
    /// while it still answers the query, so a line-by-line walk stays linear.
    #[must_use]
    pub fn exec_multi(&self, buf: &dyn TextBuffer, line: usize, col: usize) -> Option<MatchResult> {
        if line >= buf.line_count() {
            return None;
        }
        match self.reach {
            Reach::Line => {
                let text = buf.line_text(line);
                let from = char_to_byte(&text, col)?;
                self.exec_at(&text, line, from, text.len())
            }
            Reach::Lines(breaks) => {
                // The last line's own line break is not matchable, as in Vim.
                let last = line.saturating_add(breaks).min(buf.line_count() - 1);
                let text = join_lines(buf, line, last);
                let line_len = text.find('\n').unwrap_or(text.len());
                let from = char_to_byte(&text[..line_len], col)?;
                self.exec_at(&text, line, from, line_len)
            }
            Reach::Buffer => self.exec_flattened(buf, line, col),
        }
    }

    fn exec_flattened(&self, buf: &dyn TextBuffer, line: usize, col: usize) -> Option<MatchResult> {
        let key = buffer_key(buf);
        let mut memo = self.flat.borrow_mut();
        if memo.as_ref().is_none_or(|flat| flat.key != key) {
            trace!(target: "regexp.exec", pattern = %self.source, lines = buf.line_count(), "flatten");
            *memo = Some(Flattened::new(buf, key));
        }
        let flat = memo.as_mut()?;

        let line_start = *flat.starts.get(line)?;
        let line_end = flat.line_end(line);
        let from = line_start + char_to_byte(&flat.text[line_start..line_end], col)?;

        // The earliest match at or after `scan.from` starts at `scan.found`,
        // so that answer holds for every query in between.
        let found = match flat.scan {
            Some(scan) if scan.from <= from && scan.found.is_none_or(|at| at >= from) => scan.found,
            _ => {
                let found = self.re.find_at(&flat.text, from).map(|m| m.start());
                flat.scan = Some(Scan { from, found });
                found
            }
        };
        let at = found?;
        if at > line_end {
            return None;
        }
        self.exec_at(&flat.text[line_start..], line, at - line_start, line_end - line_start)
    }

    /// Match in `hay`, which starts at column 0 of `line`. Matches that
    /// begin past the first `line_len` bytes belong to a later line's scan.
    fn exec_at(&self, hay: &str, line: usize, from: usize, line_len: usize) -> Option<MatchResult> {
        let caps = self.re.captures_at(hay, from)?;
        let whole = caps.get(0)?;
        if whole.start() > line_len {
            return None;
        }
        Some(MatchResult {
            span: Range::new(locate(hay, line, whole.start()), locate(hay, line, whole.end())),
            groups: collect_groups(&caps),
        })
    }

    /// Expand a replacement template against a match.
    ///
    /// | Item            | Inserts                                  |
    /// |-----------------|------------------------------------------|
    /// | `&` / `\0`      | the whole match (`\&` in nomagic)         |
    /// | `\1` … `\9`     | a group                                  |
    /// | `\r` `\n`       | a line break                             |
    /// | `\t`            | a tab                                    |
    /// | `\u` `\l`       | next char upper / lower case             |
    /// | `\U` `\L`       | following chars upper / lower, to `\e`   |
    /// | `\e` `\E`       | end of `\U` / `\L`                       |
    /// | `\x`            | `x` literally (including `\&`, `\\`)     |
    #[must_use]
    pub fn expand(&self, m: &MatchResult, template: &str) -> String {
        let mut out = CaseWriter::default();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            match c {
                '&' if self.magic => out.push_str(m.group(0)),
                '\\' => match chars.next() {
                    Some(d @ '0'..='9') => {
                        let n = d.to_digit(10).map_or(0, |n| n as usize);
                        out.push_str(m.group(n));
                    }
                    Some('&') if !self.magic => out.push_str(m.group(0)),
                    Some('r' | 'n') => out.push_raw('\n'),
                    Some('t') => out.push_raw('\t'),
                    Some('u') => out.one_shot = Some(Case::Upper),
                    Some('l') => out.one_shot = Some(Case::Lower),
                    Some('U') => out.span = Some(Case::Upper),
                    Some('L') => out.span = Some(Case::Lower),
                    Some('e' | 'E') => {
                        out.span = None;
                        out.one_shot = None;
                    }
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                _ => out.push(c),
            }
        }
        out.text
    }
}

/// True when a pattern has an uppercase letter outside of `\x` items, the
/// test `smartcase` applies.
#[must_use]
pub fn has_uppercase(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c.is_uppercase() {
            return true;
        }
    }
    false
}

/// Escape text so it matches literally as a magic pattern.
#[must_use]
pub fn escape_magic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '/' | '.' | '*' | '$' | '^' | '~' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Match helpers
// ---------------------------------------------------------------------------

/// Convert a char column to a byte offset; `None` past the end of `s`.
fn char_to_byte(s: &str, col: usize) -> Option<usize> {
    if col == 0 {
        return Some(0);
    }
    match s.char_indices().nth(col) {
        Some((b, _)) => Some(b),
        None if s.chars().count() == col => Some(s.len()),
        None => None,
    }
}

/// Position of byte `at` in `hay`, which starts at column 0 of `line`.
fn locate(hay: &str, line: usize, at: usize) -> Position {
    let before = &hay[..at];
    match before.rfind('\n') {
        Some(nl) => Position::new(line + before.matches('\n').count(), before[nl + 1..].chars().count()),
        None => Position::new(line, before.chars().count()),
    }
}

/// Lines `first..=last` joined with `\n`.
fn join_lines(buf: &dyn TextBuffer, first: usize, last: usize) -> String {
    let mut text = buf.line_text(first);
    for line in first + 1..=last {
        text.push('\n');
        text.push_str(&buf.line_text(line));
    }
    text
}

/// Identifies one buffer at one revision.
fn buffer_key(buf: &dyn TextBuffer) -> (usize, u64) {
    (std::ptr::from_ref(buf).cast::<()>().addr(), buf.revision())
}

fn collect_groups(caps: &Captures<'_>) -> Vec<Option<String>> {
    caps.iter()
        .map(|g| g.map(|m| m.as_str().to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Flattened buffer text
// ---------------------------------------------------------------------------

/// The whole buffer as one string, lines joined with `\n`.
#[derive(Clone)]
struct Flattened {
    key: (usize, u64),
    text: String,
    /// Byte offset of each line in `text`.
    starts: Vec<usize>,
    scan: Option<Scan>,
}

/// The earliest match at or after byte `from` starts at `found`.
#[derive(Debug, Clone, Copy)]
struct Scan {
    from: usize,
    found: Option<usize>,
}

impl Flattened {
    fn new(buf: &dyn TextBuffer, key: (usize, u64)) -> Self {
        let mut text = String::new();
        let mut starts = Vec::with_capacity(buf.line_count());
        for line in 0..buf.line_count() {
            if line > 0 {
                text.push('\n');
            }
            starts.push(text.len());
            text.push_str(&buf.line_text(line));
        }
        Self {
            key,
            text,
            starts,
            scan: None,
        }
    }

    /// Byte offset just past the content of `line`.
    fn line_end(&self, line: usize) -> usize {
        self.starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next - 1)
    }
}

impl fmt::Debug for Flattened {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flattened")
            .field("revision", &self.key.1)
            .field("lines", &self.starts.len())
            .field("scan", &self.scan)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Replacement case handling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
}

/// Output buffer for template expansion that applies `\u \l \U \L`.
#[derive(Default)]
struct CaseWriter {
    text: String,
    one_shot: Option<Case>,
    span: Option<Case>,
}

impl CaseWriter {
    fn push(&mut self, c: char) {
        match self.one_shot.take().or(self.span) {
            Some(Case::Upper) => self.text.extend(c.to_uppercase()),
            Some(Case::Lower) => self.text.extend(c.to_lowercase()),
            None => self.text.push(c),
        }
    }

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push(c);
        }
    }

    /// Line breaks and tabs are not case-mapped and do not use up `\u`.
    fn push_raw(&mut self, c: char) {
        self.text.push(c);
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

struct Translation {
    regex: String,
    ignore_case: Option<bool>,
    /// Line-break items seen, one per item.
    breaks: usize,
    /// A line-break item sits under a repeat.
    unbounded: bool,
}

impl Translation {
    const fn reach(&self) -> Reach {
        if self.unbounded {
            Reach::Buffer
        } else if self.breaks > 0 {
            Reach::Lines(self.breaks)
        } else {
            Reach::Line
        }
    }
}

/// What one translated item did, for line-break bookkeeping.
#[derive(Clone, Copy)]
enum Item {
    Atom { newline: bool },
    Repeat,
    Open,
    Close,
    Branch,
    Other,
}

/// Translate a Vim pattern into `regex` syntax.
fn translate(pattern: &str, magic: bool) -> Result<Translation, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut t = Translation {
        regex: String::with_capacity(pattern.len() + 8),
        ignore_case: None,
        breaks: 0,
        unbounded: false,
    };
    let mut magic = magic;
    let mut i = 0;
    // Start of a branch: `^` anchors and `*` is literal here.
    let mut branch_start = true;
    // Whether the last atom, and each open group, can match a line break.
    let mut last_newline = false;
    let mut groups: Vec<bool> = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        let at_start = branch_start;
        branch_start = false;

        let item = if c == '\\' {
            let Some(&e) = chars.get(i) else {
                // A trailing backslash matches itself.
                push_literal(&mut t.regex, '\\');
                break;
            };
            i += 1;
            escaped_item(&mut t, &chars, &mut i, e, &mut magic, &mut branch_start, at_start)?
        } else {
            match c {
                '^' if at_start => {
                    t.regex.push('^');
                    branch_start = true;
                    Item::Other
                }
                '$' if at_branch_end(&chars, i) => {
                    t.regex.push('$');
                    Item::Other
                }
                '.' if magic => {
                    t.regex.push('.');
                    Item::Atom { newline: false }
                }
                '*' if magic && !at_start => {
                    t.regex.push('*');
                    Item::Repeat
                }
                '[' if magic => collection_item(&mut t.regex, &chars, &mut i, false),
                _ => {
                    push_literal(&mut t.regex, c);
                    Item::Atom { newline: false }
                }
            }
        };

        match item {
            Item::Atom { newline } => {
                if newline {
                    t.breaks += 1;
                    if let Some(group) = groups.last_mut() {
                        *group = true;
                    }
                }
                last_newline = newline;
            }
            Item::Repeat => t.unbounded |= last_newline,
            Item::Open => {
                groups.push(false);
                last_newline = false;
            }
            Item::Close => {
                last_newline = groups.pop().unwrap_or(false);
                if let Some(group) = groups.last_mut() {
                    *group |= last_newline;
                }
            }
            Item::Branch => last_newline = false,
            Item::Other => {}
        }
    }

    Ok(t)
}

/// Translate the item after a backslash; `i` is just past `e`.
fn escaped_item(
    t: &mut Translation,
    chars: &[char],
    i: &mut usize,
    e: char,
    magic: &mut bool,
    branch_start: &mut bool,
    at_start: bool,
) -> Result<Item, String> {
    let item = match e {
        '(' => {
            t.regex.push('(');
            *branch_start = true;
            Item::Open
        }
        ')' => {
            t.regex.push(')');
            Item::Close
        }
        '|' => {
            t.regex.push('|');
            *branch_start = true;
            Item::Branch
        }
        '+' => {
            t.regex.push('+');
            Item::Repeat
        }
        // Optional: at most once, so no more line breaks than counted.
        '=' | '?' => {
            t.regex.push('?');
            Item::Other
        }
        '{' => {
            let (quant, next) = brace_quantifier(chars, *i)?;
            t.regex.push_str(&quant);
            *i = next;
            Item::Repeat
        }
        '<' => {
            t.regex.push_str(r"\b{start}");
            Item::Other
        }
        '>' => {
            t.regex.push_str(r"\b{end}");
            Item::Other
        }
        'n' => {
            t.regex.push_str(r"\n");
            Item::Atom { newline: true }
        }
        't' => {
            t.regex.push_str(r"\t");
            Item::Atom { newline: false }
        }
        'e' => {
            t.regex.push_str(r"\x1b");
            Item::Atom { newline: false }
        }
        'r' => {
            t.regex.push_str(r"\r");
            Item::Atom { newline: false }
        }
        'c' | 'C' | 'm' | 'M' => {
            match e {
                'c' => t.ignore_case = Some(true),
                'C' => t.ignore_case = Some(false),
                'm' => *magic = true,
                _ => *magic = false,
            }
            *branch_start = at_start;
            Item::Other
        }
        '_' => {
            let Some(&f) = chars.get(*i) else {
                return Err("\\_ at end of pattern".to_string());
            };
            *i += 1;
            match f {
                '.' => {
                    t.regex.push_str("(?s:.)");
                    Item::Atom { newline: true }
                }
                '^' => {
                    t.regex.push('^');
                    Item::Other
                }
                '$' => {
                    t.regex.push('$');
                    Item::Other
                }
                '[' => {
                    let (class, next, newline) = collection(chars, *i, true)
                        .ok_or_else(|| "missing ] after \\_[".to_string())?;
                    t.regex.push_str(&class);
                    *i = next;
                    Item::Atom { newline }
                }
                _ => {
                    let class = class_item(f, true)
                        .ok_or_else(|| format!("unsupported \\_{f}"))?;
                    t.regex.push_str(&class);
                    Item::Atom { newline: true }
                }
            }
        }
        '.' if !*magic => {
            t.regex.push('.');
            Item::Atom { newline: false }
        }
        '*' if !*magic => {
            t.regex.push('*');
            Item::Repeat
        }
        '[' if !*magic => collection_item(&mut t.regex, chars, i, false),
        _ => {
            if let Some(class) = class_item(e, false) {
                t.regex.push_str(&class);
            } else if e.is_ascii_alphanumeric() || e == '@' || e == '%' || e == '&' {
                return Err(format!("unsupported item \\{e}"));
            } else {
                push_literal(&mut t.regex, e);
            }
            Item::Atom { newline: false }
        }
    };
    Ok(item)
}

/// A `[...]` collection, or a literal `[` when it is unterminated.
fn collection_item(out: &mut String, chars: &[char], i: &mut usize, with_newline: bool) -> Item {
    match collection(chars, *i, with_newline) {
        Some((class, next, newline)) => {
            out.push_str(&class);
            *i = next;
            Item::Atom { newline }
        }
        None => {
            push_literal(out, '[');
            Item::Atom { newline: false }
        }
    }
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// `$` is an anchor only at the end of a branch.
fn at_branch_end(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        None => true,
        Some('\\') => matches!(chars.get(i + 1), Some('|' | ')' | 'n')),
        Some(_) => false,
    }
}

/// Character class escapes. `with_newline` is the `\_x` form.
fn class_item(c: char, with_newline: bool) -> Option<String> {
    let (inner, negated) = match c {
        's' => (" \\t", false),
        'S' => (" \\t", true),
        'd' => ("0-9", false),
        'D' => ("0-9", true),
        'w' => ("0-9A-Za-z_", false),
        'W' => ("0-9A-Za-z_", true),
        'a' => ("A-Za-z", false),
        'A' => ("A-Za-z", true),
        'l' => ("a-z", false),
        'L' => ("a-z", true),
        'u' => ("A-Z", false),
        'U' => ("A-Z", true),
        'x' => ("0-9A-Fa-f", false),
        'X' => ("0-9A-Fa-f", true),
        'h' => ("A-Za-z_", false),
        'H' => ("A-Za-z_", true),
        'o' => ("0-7", false),
        'O' => ("0-7", true),
        'k' => ("\\w", false),
        _ => return None,
    };
    Some(render_class(inner, negated, with_newline))
}

/// Render a class body. Plain classes never match a line break; `\_` classes
/// always do.
fn render_class(inner: &str, negated: bool, with_newline: bool) -> String {
    let caret = if negated { "^" } else { "" };
    let nl = if negated == with_newline { "" } else { "\\n" };
    format!("[{caret}{inner}{nl}]")
}

/// Parse a `[...]` collection starting just after the `[`. Returns the regex
/// class, the index after the closing `]` and whether the class can match a
/// line break, or `None` when unterminated (then the `[` is literal).
fn collection(chars: &[char], start: usize, with_newline: bool) -> Option<(String, usize, bool)> {
    let mut j = start;
    let negated = chars.get(j) == Some(&'^');
    if negated {
        j += 1;
    }
    let mut inner = String::new();
    let mut has_newline = false;
    if chars.get(j) == Some(&']') {
        inner.push_str("\\]");
        j += 1;
    }
    loop {
        let c = *chars.get(j)?;
        j += 1;
        match c {
            ']' => break,
            '[' if chars.get(j) == Some(&':') => {
                let rest: String = chars[j..].iter().collect();
                if let Some(close) = rest.find(":]") {
                    inner.push('[');
                    inner.push_str(&rest[..close + 2]);
                    j += rest[..close + 2].chars().count();
                } else {
                    inner.push_str("\\[");
                }
            }
            '[' => inner.push_str("\\["),
            '\\' => {
                let esc = match chars.get(j) {
                    Some('e') => Some("\\x1b"),
                    Some('t') => Some("\\t"),
                    Some('r') => Some("\\r"),
                    Some('n') => Some("\\n"),
                    Some('\\') => Some("\\\\"),
                    Some(']') => Some("\\]"),
                    Some('^') => Some("\\^"),
                    Some('-') => Some("\\-"),
                    _ => None,
                };
                if let Some(esc) = esc {
                    has_newline |= chars.get(j) == Some(&'n');
                    inner.push_str(esc);
                    j += 1;
                } else {
                    inner.push_str("\\\\");
                }
            }
            '&' | '~' => {
                inner.push('\\');
                inner.push(c);
            }
            _ => inner.push(c),
        }
    }
    let newline = if negated {
        with_newline && !has_newline
    } else {
        with_newline || has_newline
    };
    Some((render_class(&inner, negated, with_newline), j, newline))
}

/// Parse the body of `\{...}` starting just after the `{`.
fn brace_quantifier(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut j = start;
    let mut body = String::new();
    loop {
        match chars.get(j) {
            None => return Err("missing } after \\{".to_string()),
            Some('\\') if chars.get(j + 1) == Some(&'}') => {
                j += 2;
                break;
            }
            Some('}') => {
                j += 1;
                break;
            }
            Some(&c) => {
                body.push(c);
                j += 1;
            }
        }
    }

    let (lazy, body) = body
        .strip_prefix('-')
        .map_or((false, body.as_str()), |rest| (true, rest));
    if !body.chars().all(|c| c.is_ascii_digit() || c == ',') || body.matches(',').count() > 1 {
        return Err(format!("invalid \\{{{body}}}"));
    }

    let quant = match body.split_once(',') {
        None if body.is_empty() => "*".to_string(),
        None => format!("{{{body}}}"),
        Some(("", "")) => "*".to_string(),
        Some(("", max)) => format!("{{0,{max}}}"),
        Some((min, max)) => format!("{{{min},{max}}}"),
    };
    let lazy = if lazy { "?" } else { "" };
    Ok((format!("{quant}{lazy}"), j))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
