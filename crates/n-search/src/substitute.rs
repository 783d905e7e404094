//! `:s`, `:&` and `:~` — parsing the command and running it.
//!
//! # Command forms
//!
//! | Form                         | Pattern                    | Replacement      |
//! |------------------------------|----------------------------|------------------|
//! | `:s/pat/rep/[flags] [count]` | `pat` (empty: last used)   | `rep`            |
//! | `:s [flags] [count]`, `:&`   | last substitute pattern    | last replacement |
//! | `:~ [flags] [count]`         | last used pattern          | last replacement |
//! | `:s\/rep/`, `:s\?rep?`       | last search pattern        | `rep`            |
//! | `:s\&rep&`                   | last substitute pattern    | `rep`            |
//!
//! Any non-letter can delimit: `:s#a/b#c#`.
//!
//! # Flags
//!
//! | Flag | Effect                                             |
//! |------|----------------------------------------------------|
//! | `&`  | keep the previous flags (must come first)          |
//! | `g`  | toggle replace-all-per-line (starts from `gdefault`) |
//! | `c`  | toggle confirm each replacement                    |
//! | `e`  | toggle error reporting                             |
//! | `r`  | an empty pattern means the last used pattern       |
//! | `i`  | ignore case                                        |
//! | `I`  | match case                                         |
//! | `p`  | print the last substituted line                    |
//!
//! A trailing count `N` operates on `N` lines starting at the last line of
//! the range.
//!
//! # State
//!
//! Parsing and compiling read [`PatternState`] but do not write it. Only once
//! the command is known to be good are the pattern, replacement and flags
//! remembered. A malformed command changes nothing.

use bitflags::bitflags;
use tracing::debug;

use crate::error::SearchError;
use crate::executor::{self, SubstituteEnv, SubstituteOutcome};
use crate::options::OptionSource;
use crate::pattern::{PatternFamily, PatternState};
use crate::position::{LineRange, Position};
use crate::search::{skip_regexp, CaseMode, SearchEnv};

// ---------------------------------------------------------------------------
// SubFlags
// ---------------------------------------------------------------------------

bitflags! {
    /// Flags of a substitute command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SubFlags: u8 {
        /// `&`: start from the previous command's flags.
        const KEEP_FLAGS = 1 << 0;
        /// `c`
        const CONFIRM = 1 << 1;
        /// `e`: no error for a missing match or a bad pattern.
        const IGNORE_ERROR = 1 << 2;
        /// `g`
        const GLOBAL = 1 << 3;
        /// `i`
        const IGNORE_CASE = 1 << 4;
        /// `I`
        const NO_IGNORE_CASE = 1 << 5;
        /// `p`
        const PRINT = 1 << 6;
        /// `r`
        const REUSE = 1 << 7;
    }
}

impl SubFlags {
    /// The subset remembered for the next `&`.
    #[must_use]
    pub const fn persisted(self) -> Self {
        self.difference(Self::KEEP_FLAGS.union(Self::REUSE))
    }

    /// Case mode the flags select. Substitutions never use `smartcase`.
    #[must_use]
    pub const fn case_mode(self) -> CaseMode {
        if self.contains(Self::IGNORE_CASE) {
            CaseMode::Ignore
        } else if self.contains(Self::NO_IGNORE_CASE) {
            CaseMode::Match
        } else {
            CaseMode::NoSmartcase
        }
    }
}

// ---------------------------------------------------------------------------
// SubstituteCommand
// ---------------------------------------------------------------------------

/// A parsed substitute command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteCommand {
    /// The pattern, with any empty-pattern fallback resolved.
    pub pattern: String,
    /// The replacement template, `~` already expanded.
    pub replacement: String,
    pub flags: SubFlags,
    /// Lines to work on; `None` when the command does nothing (a zero count
    /// or trailing text under the `e` flag).
    pub lines: Option<LineRange>,
}

/// Characters that, right after `:s`, start flags rather than a delimiter.
const FLAG_START: &str = "0123456789cegriIp|\"&";

/// Parse the argument of `:s` (`excmd` `'s'`), `:&` (`'&'`) or `:~` (`'~'`).
///
/// `range` is the command's line range, already resolved.
///
/// # Errors
///
/// - [`SearchError::InvalidDelimiter`] for a letter as delimiter.
/// - [`SearchError::InvalidEscape`] for `\` not followed by `/`, `?` or `&`.
/// - [`SearchError::NoPreviousSubstitute`] when repeating with no history.
/// - [`SearchError::ZeroCount`], [`SearchError::TrailingCharacters`] unless
///   the `e` flag is given.
/// - [`SearchError::NoPreviousPattern`] for an empty pattern with no history.
pub fn parse_substitute(
    state: &PatternState,
    excmd: char,
    arg: &str,
    range: LineRange,
    line_count: usize,
    options: &dyn OptionSource,
) -> Result<SubstituteCommand, SearchError> {
    let magic = options.is_set("magic");
    let mut family = if excmd == '~' {
        PatternFamily::LastUsed
    } else {
        PatternFamily::Substitute
    };

    let first = arg.chars().next();
    let new_form =
        excmd == 's' && first.is_some_and(|c| !c.is_whitespace() && !FLAG_START.contains(c));

    let (pattern, replacement, mut i) = if let Some(delim) = first.filter(|_| new_form) {
        if delim.is_alphabetic() {
            return Err(SearchError::InvalidDelimiter);
        }
        let (pattern, delim, i) = if delim == '\\' {
            let escaped = arg[1..].chars().next();
            family = match escaped {
                Some('/' | '?') => PatternFamily::Search,
                Some('&') => PatternFamily::Substitute,
                _ => return Err(SearchError::InvalidEscape),
            };
            (String::new(), escaped.unwrap_or('/'), 2)
        } else {
            family = PatternFamily::LastUsed;
            let start = delim.len_utf8();
            let end = skip_regexp(arg, start, delim, magic);
            let next = if end < arg.len() { end + delim.len_utf8() } else { end };
            (arg[start..end].to_string(), delim, next)
        };
        let (replacement, i) = scan_replacement(arg, i, delim);
        let replacement = expand_tilde(&replacement, state.last_replace(), magic);
        (pattern, replacement, i)
    } else {
        // Repeat form: the stored replacement is used as is.
        let replacement = state
            .last_replace()
            .ok_or(SearchError::NoPreviousSubstitute)?
            .to_string();
        (String::new(), replacement, 0)
    };

    // Flags.
    let mut flags = if arg[i..].starts_with('&') {
        i += 1;
        state.last_flags() | SubFlags::KEEP_FLAGS
    } else if options.is_set("gdefault") {
        SubFlags::GLOBAL
    } else {
        SubFlags::empty()
    };
    let (parsed, next) = scan_flags(arg, i, flags);
    flags = parsed;
    i = next;
    if flags.contains(SubFlags::REUSE) {
        family = PatternFamily::LastUsed;
    }

    // Count.
    let mut lines = range;
    i = skip_white(arg, i);
    let (count, next) = scan_count(arg, i);
    i = next;
    if let Some(n) = count {
        if n == 0 {
            if flags.contains(SubFlags::IGNORE_ERROR) {
                return Ok(idle(replacement, flags));
            }
            return Err(SearchError::ZeroCount);
        }
        let start = range.end;
        lines = LineRange::new(start, start.saturating_add(n - 1)).normalized(line_count);
    }

    // Trailing text; `"` starts a comment.
    i = skip_white(arg, i);
    let rest = &arg[i..];
    if !rest.is_empty() && !rest.starts_with('"') {
        if flags.contains(SubFlags::IGNORE_ERROR) {
            return Ok(idle(replacement, flags));
        }
        return Err(SearchError::TrailingCharacters(rest.to_string()));
    }

    let pattern = if pattern.is_empty() {
        state
            .last_by(family)
            .ok_or(SearchError::NoPreviousPattern)?
            .to_string()
    } else {
        pattern
    };

    debug!(
        target: "substitute.parse",
        excmd = %excmd,
        %pattern,
        %replacement,
        ?flags,
        %lines,
        "parsed"
    );
    Ok(SubstituteCommand {
        pattern,
        replacement,
        flags,
        lines: Some(lines),
    })
}

/// Parse, compile and run a substitute command.
///
/// `range` is the resolved line range; `cursor` is recorded in the jump list
/// on the first match.
///
/// # Errors
///
/// Parse errors from [`parse_substitute`], and
/// [`SearchError::PatternCompile`] unless the `e` flag is given. A run that
/// replaces nothing is not an error here; see
/// [`SubstituteOutcome::check_found`].
pub fn substitute(
    state: &mut PatternState,
    env: &mut SubstituteEnv<'_>,
    excmd: char,
    arg: &str,
    range: LineRange,
    cursor: Position,
) -> Result<SubstituteOutcome, SearchError> {
    let cmd = parse_substitute(state, excmd, arg, range, env.buffer.line_count(), env.options)?;
    let Some(lines) = cmd.lines else {
        return Ok(SubstituteOutcome::nothing(cmd.pattern, cmd.flags));
    };

    let compiled = SearchEnv::new(&*env.buffer, env.options)
        .compile(&cmd.pattern, cmd.flags.case_mode());
    let re = match compiled {
        Ok(re) => re,
        Err(e) if cmd.flags.contains(SubFlags::IGNORE_ERROR) => {
            debug!(target: "substitute.parse", error = %e, "compile_failed_ignored");
            return Ok(SubstituteOutcome::nothing(cmd.pattern, cmd.flags));
        }
        Err(e) => return Err(e),
    };

    state.record_substitute(&cmd.pattern, &cmd.replacement, cmd.flags.persisted());
    Ok(executor::execute(env, &re, &cmd.replacement, lines, cmd.flags, cursor))
}

/// Expand `~` in a replacement to the previous replacement.
///
/// `\~` is a literal `~` (in nomagic mode the roles swap). Other `\x` pairs
/// are kept. A `\=` expression replacement is left alone.
#[must_use]
pub fn expand_tilde(replacement: &str, previous: Option<&str>, magic: bool) -> String {
    let Some(previous) = previous else {
        return replacement.to_string();
    };
    if replacement.starts_with("\\=") {
        return replacement.to_string();
    }

    let mut out = String::with_capacity(replacement.len() + previous.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '~' if magic => out.push_str(previous),
            '\\' => match chars.next() {
                Some('~') if !magic => out.push_str(previous),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Scanners: each takes the text and a byte index, returns (value, next index)
// ---------------------------------------------------------------------------

/// Scan a replacement up to an unescaped `delim`. `\x` pairs are kept
/// verbatim. Returns the index past the delimiter (or the end).
fn scan_replacement(arg: &str, start: usize, delim: char) -> (String, usize) {
    let mut out = String::new();
    let mut chars = arg[start..].char_indices();
    while let Some((off, c)) = chars.next() {
        if c == delim {
            return (out, start + off + c.len_utf8());
        }
        out.push(c);
        if c == '\\' {
            if let Some((_, next)) = chars.next() {
                out.push(next);
            }
        }
    }
    (out, arg.len())
}

fn scan_flags(arg: &str, start: usize, mut flags: SubFlags) -> (SubFlags, usize) {
    let mut i = start;
    for c in arg[start..].chars() {
        match c {
            'g' => flags.toggle(SubFlags::GLOBAL),
            'c' => flags.toggle(SubFlags::CONFIRM),
            'e' => flags.toggle(SubFlags::IGNORE_ERROR),
            'r' => flags.insert(SubFlags::REUSE),
            'p' => flags.insert(SubFlags::PRINT),
            'i' => {
                flags.insert(SubFlags::IGNORE_CASE);
                flags.remove(SubFlags::NO_IGNORE_CASE);
            }
            'I' => {
                flags.insert(SubFlags::NO_IGNORE_CASE);
                flags.remove(SubFlags::IGNORE_CASE);
            }
            _ => break,
        }
        i += 1;
    }
    (flags, i)
}

fn scan_count(arg: &str, start: usize) -> (Option<usize>, usize) {
    let rest = &arg[start..];
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return (None, start);
    }
    let n = rest[..digits].parse().unwrap_or(usize::MAX);
    (Some(n), start + digits)
}

fn skip_white(arg: &str, start: usize) -> usize {
    let rest = &arg[start..];
    start + (rest.len() - rest.trim_start_matches([' ', '\t']).len())
}

fn idle(replacement: String, flags: SubFlags) -> SubstituteCommand {
    SubstituteCommand {
        pattern: String::new(),
        replacement,
        flags,
        lines: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SearchOptions;
    use crate::pattern::SearchDirection;
    use pretty_assertions::assert_eq;

    const LINES: usize = 10;

    fn parse(state: &PatternState, arg: &str) -> Result<SubstituteCommand, SearchError> {
        parse_with(state, 's', arg, &SearchOptions::default())
    }

    fn parse_with(
        state: &PatternState,
        excmd: char,
        arg: &str,
        opts: &SearchOptions,
    ) -> Result<SubstituteCommand, SearchError> {
        parse_substitute(state, excmd, arg, LineRange::single(2), LINES, opts)
    }

    fn history() -> PatternState {
        let mut st = PatternState::new();
        st.record_substitute("sub", "rep", SubFlags::GLOBAL);
        st.record_search("srch", "", SearchDirection::Forward);
        st
    }

    // -- New pattern form ---------------------------------------------------

    #[test]
    fn basic_command() {
        let cmd = parse(&PatternState::new(), "/foo/bar/g").unwrap();
        assert_eq!(
            cmd,
            SubstituteCommand {
                pattern: "foo".into(),
                replacement: "bar".into(),
                flags: SubFlags::GLOBAL,
                lines: Some(LineRange::single(2)),
            }
        );
    }

    #[test]
    fn alternate_delimiter_and_escapes() {
        let cmd = parse(&PatternState::new(), r"#a/b#c\#d#").unwrap();
        assert_eq!(cmd.pattern, "a/b");
        assert_eq!(cmd.replacement, r"c\#d");

        let cmd = parse(&PatternState::new(), r"/a\/b/c\/d/").unwrap();
        assert_eq!(cmd.pattern, r"a\/b");
        assert_eq!(cmd.replacement, r"c\/d");
    }

    #[test]
    fn unterminated_sections() {
        let cmd = parse(&PatternState::new(), "/foo/bar").unwrap();
        assert_eq!(cmd.replacement, "bar");
        assert_eq!(cmd.flags, SubFlags::empty());

        let cmd = parse(&PatternState::new(), "/foo").unwrap();
        assert_eq!(cmd.pattern, "foo");
        assert_eq!(cmd.replacement, "");
    }

    #[test]
    fn collection_hides_delimiter() {
        let cmd = parse(&PatternState::new(), "/[/]/x/").unwrap();
        assert_eq!(cmd.pattern, "[/]");
        assert_eq!(cmd.replacement, "x");
    }

    #[test]
    fn letter_delimiter_is_rejected() {
        assert_eq!(
            parse(&PatternState::new(), "afooabara"),
            Err(SearchError::InvalidDelimiter)
        );
    }

    #[test]
    fn escaped_family_forms() {
        let st = history();
        let cmd = parse(&st, r"\/x/").unwrap();
        assert_eq!(cmd.pattern, "srch");
        assert_eq!(cmd.replacement, "x");

        let cmd = parse(&st, r"\?x?").unwrap();
        assert_eq!(cmd.pattern, "srch");

        let cmd = parse(&st, r"\&x&").unwrap();
        assert_eq!(cmd.pattern, "sub");

        assert_eq!(parse(&st, r"\x/y/"), Err(SearchError::InvalidEscape));
    }

    #[test]
    fn empty_pattern_uses_last_used() {
        let st = history();
        assert_eq!(parse(&st, "//x/").unwrap().pattern, "srch");
        assert_eq!(
            parse(&PatternState::new(), "//x/"),
            Err(SearchError::NoPreviousPattern)
        );
    }

    // -- Repeat forms -------------------------------------------------------

    #[test]
    fn repeat_uses_last_substitute() {
        let st = history();
        let cmd = parse(&st, "").unwrap();
        assert_eq!(cmd.pattern, "sub");
        assert_eq!(cmd.replacement, "rep");
        assert_eq!(cmd.flags, SubFlags::empty());
    }

    #[test]
    fn repeat_without_history_fails() {
        assert_eq!(
            parse(&PatternState::new(), ""),
            Err(SearchError::NoPreviousSubstitute)
        );
        assert_eq!(
            parse_with(&PatternState::new(), '&', "&", &SearchOptions::default()),
            Err(SearchError::NoPreviousSubstitute)
        );
    }

    #[test]
    fn tilde_command_uses_last_used_pattern() {
        let st = history();
        let cmd = parse_with(&st, '~', "", &SearchOptions::default()).unwrap();
        assert_eq!(cmd.pattern, "srch");
        assert_eq!(cmd.replacement, "rep");
    }

    #[test]
    fn r_flag_switches_to_last_used() {
        let st = history();
        assert_eq!(parse(&st, "r").unwrap().pattern, "srch");
        assert_eq!(parse(&st, "").unwrap().pattern, "sub");
    }

    // -- Flags --------------------------------------------------------------

    #[test]
    fn ampersand_keeps_previous_flags() {
        let st = history();
        let cmd = parse(&st, "&").unwrap();
        assert_eq!(cmd.flags, SubFlags::GLOBAL | SubFlags::KEEP_FLAGS);

        let cmd = parse(&st, "&g").unwrap();
        assert_eq!(cmd.flags, SubFlags::KEEP_FLAGS);

        let cmd = parse_with(&st, '&', "&c", &SearchOptions::default()).unwrap();
        assert!(cmd.flags.contains(SubFlags::GLOBAL | SubFlags::CONFIRM));
    }

    #[test]
    fn flags_toggle_and_gdefault() {
        let st = PatternState::new();
        let cmd = parse(&st, "/a/b/gg").unwrap();
        assert_eq!(cmd.flags, SubFlags::empty());

        let gd = SearchOptions { gdefault: true, ..SearchOptions::default() };
        assert_eq!(parse_with(&st, 's', "/a/b/", &gd).unwrap().flags, SubFlags::GLOBAL);
        assert_eq!(parse_with(&st, 's', "/a/b/g", &gd).unwrap().flags, SubFlags::empty());
    }

    #[test]
    fn case_flags_override_each_other() {
        let st = PatternState::new();
        let cmd = parse(&st, "/a/b/iI").unwrap();
        assert_eq!(cmd.flags, SubFlags::NO_IGNORE_CASE);
        assert_eq!(cmd.flags.case_mode(), CaseMode::Match);
        assert_eq!(parse(&st, "/a/b/Ii").unwrap().flags.case_mode(), CaseMode::Ignore);
        assert_eq!(parse(&st, "/a/b/").unwrap().flags.case_mode(), CaseMode::NoSmartcase);
    }

    #[test]
    fn persisted_drops_one_shot_flags() {
        let f = SubFlags::KEEP_FLAGS | SubFlags::REUSE | SubFlags::GLOBAL | SubFlags::PRINT;
        assert_eq!(f.persisted(), SubFlags::GLOBAL | SubFlags::PRINT);
    }

    // -- Count and trailing text --------------------------------------------

    #[test]
    fn count_starts_at_range_end() {
        let st = PatternState::new();
        let cmd = parse_substitute(&st, 's', "/a/b/g 3", LineRange::new(0, 4), LINES, &SearchOptions::default())
            .unwrap();
        assert_eq!(cmd.lines, Some(LineRange::new(4, 6)));

        let cmd = parse(&st, "/a/b/ 99").unwrap();
        assert_eq!(cmd.lines, Some(LineRange::new(2, 9)));
    }

    #[test]
    fn zero_count() {
        let st = PatternState::new();
        assert_eq!(parse(&st, "/a/b/ 0"), Err(SearchError::ZeroCount));
        assert_eq!(parse(&st, "/a/b/e 0").unwrap().lines, None);
    }

    #[test]
    fn trailing_text() {
        let st = PatternState::new();
        assert_eq!(
            parse(&st, "/a/b/g x"),
            Err(SearchError::TrailingCharacters("x".into()))
        );
        assert_eq!(parse(&st, "/a/b/ge x").unwrap().lines, None);
        assert!(parse(&st, "/a/b/g \" note").is_ok());
    }

    // -- ~ expansion --------------------------------------------------------

    #[test]
    fn tilde_expansion() {
        assert_eq!(expand_tilde("x~y", Some("Z"), true), "xZy");
        assert_eq!(expand_tilde(r"x\~y", Some("Z"), true), r"x\~y");
        assert_eq!(expand_tilde(r"\\~", Some("Z"), true), r"\\Z");
        assert_eq!(expand_tilde(r"\=~", Some("Z"), true), r"\=~");
        assert_eq!(expand_tilde("x~y", None, true), "x~y");
        assert_eq!(expand_tilde(r"x\~y~", Some("Z"), false), "xZy~");
    }

    #[test]
    fn parse_expands_tilde_from_state() {
        let st = history();
        assert_eq!(parse(&st, "/a/<~>/").unwrap().replacement, "<rep>");
    }
}
