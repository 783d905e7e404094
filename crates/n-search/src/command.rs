//! Ex command lines: `:[range]s…`, `:[range]&…`, `:[range]~…`, `:set`.
//!
//! # Ranges
//!
//! | Range          | Lines                                        |
//! |----------------|----------------------------------------------|
//! | (none)         | the cursor line                              |
//! | `%`            | the whole buffer                             |
//! | `N`            | line N                                       |
//! | `N,M`          | lines N through M                            |
//! | `.` `$`        | the cursor line, the last line               |
//! | `.,+N` `$-2,$` | any address followed by `+N` / `-N` offsets  |
//! | `'<,'>`        | the last visual selection                    |
//!
//! Addresses are parsed into a [`CmdRange`] first and resolved against the
//! buffer later with [`CmdRange::resolve`], since the cursor and line count
//! are only known when the command runs.

use crate::error::SearchError;
use crate::position::LineRange;

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Where an address counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressBase {
    /// `.`, or an address that is only an offset (`+3`).
    Current,
    /// `$`
    Last,
    /// A line number as typed (1-indexed).
    Line(usize),
}

/// One line address with its trailing `+N` / `-N` offsets summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub base: AddressBase,
    pub offset: isize,
}

impl Address {
    #[must_use]
    pub const fn line(n: usize) -> Self {
        Self { base: AddressBase::Line(n), offset: 0 }
    }

    /// Resolve to a 0-indexed line.
    fn resolve(self, cursor: usize, line_count: usize) -> Result<usize, SearchError> {
        let base = match self.base {
            AddressBase::Current => signed(cursor),
            AddressBase::Last => signed(line_count) - 1,
            // Line 0 means "before the first line"; for `:s` that is line 1.
            AddressBase::Line(n) => signed(n.max(1)) - 1,
        };
        let line = base.checked_add(self.offset).ok_or(SearchError::InvalidAddress)?;
        usize::try_from(line)
            .ok()
            .filter(|&l| l < line_count)
            .ok_or(SearchError::InvalidAddress)
    }
}

/// An address range prefix, as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmdRange {
    /// No range given: the cursor line.
    #[default]
    CurrentLine,
    /// `%`
    All,
    /// `'<,'>`
    Visual,
    /// One or two addresses. A single address is stored twice.
    Lines(Address, Address),
}

impl CmdRange {
    /// Resolve to 0-indexed lines. A backwards range is swapped.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidAddress`] if an address falls outside the
    /// buffer, or `'<,'>` is used with no visual selection.
    pub fn resolve(
        self,
        cursor_line: usize,
        line_count: usize,
        visual: Option<LineRange>,
    ) -> Result<LineRange, SearchError> {
        match self {
            Self::CurrentLine => Ok(LineRange::single(cursor_line)),
            Self::All => Ok(LineRange::new(0, line_count.saturating_sub(1))),
            Self::Visual => visual
                .map(|v| v.normalized(line_count))
                .ok_or(SearchError::InvalidAddress),
            Self::Lines(a, b) => {
                let start = a.resolve(cursor_line, line_count)?;
                let end = b.resolve(cursor_line, line_count)?;
                Ok(LineRange::new(start, end))
            }
        }
    }
}

/// Parse a range prefix from the start of a command string.
///
/// Returns `(range, rest)` where `rest` is the command string after the range.
/// If no range is found, returns `(CmdRange::CurrentLine, input)`.
#[must_use]
pub fn parse_range(input: &str) -> (CmdRange, &str) {
    if let Some(rest) = input.strip_prefix('%') {
        return (CmdRange::All, rest);
    }
    if let Some(rest) = input.strip_prefix("'<,'>") {
        return (CmdRange::Visual, rest);
    }

    let Some((first, rest)) = parse_address(input) else {
        return (CmdRange::CurrentLine, input);
    };
    let Some(after_comma) = rest.strip_prefix(',') else {
        return (CmdRange::Lines(first, first), rest);
    };
    // `N,` with nothing after the comma means `N,.`.
    let (second, rest) = parse_address(after_comma).unwrap_or((
        Address { base: AddressBase::Current, offset: 0 },
        after_comma,
    ));
    (CmdRange::Lines(first, second), rest)
}

/// Parse one address: an optional base followed by any number of offsets.
fn parse_address(input: &str) -> Option<(Address, &str)> {
    let (base, mut rest) = match input.as_bytes().first().copied()? {
        b'.' => (Some(AddressBase::Current), &input[1..]),
        b'$' => (Some(AddressBase::Last), &input[1..]),
        b if b.is_ascii_digit() => {
            let (n, rest) = parse_line_number(input)?;
            (Some(AddressBase::Line(n)), rest)
        }
        _ => (None, input),
    };

    let mut offset: isize = 0;
    let mut any_offset = false;
    while let Some(sign) = rest.chars().next().filter(|c| matches!(c, '+' | '-')) {
        let after = &rest[1..];
        let (n, after) = parse_line_number(after).unwrap_or((1, after));
        let n = signed(n);
        offset = if sign == '+' { offset.saturating_add(n) } else { offset.saturating_sub(n) };
        any_offset = true;
        rest = after;
    }

    match base {
        Some(base) => Some((Address { base, offset }, rest)),
        None if any_offset => Some((Address { base: AddressBase::Current, offset }, rest)),
        None => None,
    }
}

/// Parse a decimal number from the start of `input`.
///
/// Returns `(number, rest)` or `None` if the input doesn't start with a digit.
fn parse_line_number(input: &str) -> Option<(usize, &str)> {
    let end = input
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let num: usize = input[..end].parse().ok()?;
    Some((num, &input[end..]))
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A parsed ex command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// `:s`, `:&` or `:~`. `excmd` is `'s'`, `'&'` or `'~'`; `arg` is
    /// everything after the command name, handed to
    /// [`parse_substitute`](crate::substitute::parse_substitute) as is.
    Substitute { range: CmdRange, excmd: char, arg: String },
    /// `:set args`
    Set(String),
    /// A range and nothing else: move to its last line.
    Goto(CmdRange),
}

/// Parse a command string (with or without the leading `:`).
///
/// # Errors
///
/// [`SearchError::NotACommand`] for anything that is not a substitute,
/// `:set`, or a bare range.
pub fn parse_ex(input: &str) -> Result<ExCommand, SearchError> {
    let trimmed = input.trim_start().trim_start_matches(':').trim_start();
    let (range, rest) = parse_range(trimmed);
    let rest = rest.trim_start();

    if rest.is_empty() {
        if range == CmdRange::CurrentLine {
            return Err(SearchError::NotACommand(input.trim().to_string()));
        }
        return Ok(ExCommand::Goto(range));
    }

    if let Some(excmd @ ('&' | '~')) = rest.chars().next() {
        return Ok(ExCommand::Substitute { range, excmd, arg: rest[1..].to_string() });
    }

    let name_len = rest
        .bytes()
        .position(|b| !b.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (name, arg) = rest.split_at(name_len);

    match name {
        "se" | "set" => Ok(ExCommand::Set(arg.trim().to_string())),
        _ if !name.is_empty() && "substitute".starts_with(name) => {
            Ok(ExCommand::Substitute { range, excmd: 's', arg: arg.to_string() })
        }
        _ => Err(SearchError::NotACommand(input.trim().to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
