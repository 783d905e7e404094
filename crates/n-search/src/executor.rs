//! The substitute loop: find, confirm, replace, advance.
//!
//! The loop walks a `(line, column)` cursor from the first line of the range.
//! On each step it asks the matcher for the next match at or after that
//! column:
//!
//! - **No match** — move to column 0 of the next line.
//! - **Match** — the first one of the run records a jump. Without `g`, only
//!   the first match on a line is eligible. With `c`, the [`Confirm`]
//!   collaborator decides; see [`ConfirmChoice`].
//! - **Replace** — the buffer is edited over the match. If the edit adds or
//!   removes line breaks, the last line of the range moves with it, so a
//!   range always covers the same text it did before the run started.
//! - **Advance** — with `g`, continue on the line holding the end of the
//!   new text; without `g`, go to the next line. A zero-width match always
//!   steps one column so the loop terminates.
//!
//! Replacements are never rolled back: quitting keeps what was done.

use tracing::{debug, trace};

use crate::buffer::TextBuffer;
use crate::error::SearchError;
use crate::jumplist::JumpRecorder;
use crate::options::OptionSource;
use crate::position::{LineRange, Position, Range};
use crate::regexp::Regexp;
use crate::substitute::SubFlags;

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// Answer to "replace with ...? (y/n/a/q/l)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    /// `y`: replace this match.
    Yes,
    /// `n`: skip this match.
    No,
    /// `a`: replace this and every remaining match without asking.
    AllRemaining,
    /// `q`: stop now.
    Quit,
    /// `l`: replace this match, then stop.
    LastThenStop,
}

impl ConfirmChoice {
    /// Map a prompt key to a choice.
    #[must_use]
    pub const fn from_key(key: char) -> Option<Self> {
        match key {
            'y' => Some(Self::Yes),
            'n' => Some(Self::No),
            'a' => Some(Self::AllRemaining),
            'q' | '\u{1b}' => Some(Self::Quit),
            'l' => Some(Self::LastThenStop),
            _ => None,
        }
    }
}

/// Decides each replacement of a `c`-flagged substitute.
///
/// Called with the match span and the text that would replace it. Blocks
/// until it has an answer.
pub trait Confirm {
    fn confirm_replace(&mut self, span: Range, replacement: &str) -> ConfirmChoice;
}

impl<F> Confirm for F
where
    F: FnMut(Range, &str) -> ConfirmChoice,
{
    fn confirm_replace(&mut self, span: Range, replacement: &str) -> ConfirmChoice {
        self(span, replacement)
    }
}

/// Accepts every replacement. For hosts that never pass `c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Confirm for AcceptAll {
    fn confirm_replace(&mut self, _span: Range, _replacement: &str) -> ConfirmChoice {
        ConfirmChoice::Yes
    }
}

// ---------------------------------------------------------------------------
// Environment and outcome
// ---------------------------------------------------------------------------

/// Everything a substitute touches besides the pattern state.
pub struct SubstituteEnv<'a> {
    pub buffer: &'a mut dyn TextBuffer,
    pub options: &'a dyn OptionSource,
    pub confirm: &'a mut dyn Confirm,
    pub jumps: &'a mut dyn JumpRecorder,
}

/// What a substitute did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstituteOutcome {
    /// Number of replacements made.
    pub substitutions: usize,
    /// Number of lines on which a replacement was made.
    pub lines: usize,
    /// True if the user answered `q`.
    pub quit: bool,
    /// Where the cursor goes: first non-blank of the line the last
    /// replacement started on. `None` if nothing was replaced.
    pub cursor: Option<Position>,
    /// With the `p` flag, the text of that line after the replacement.
    pub printed: Option<String>,
    /// The pattern that was used.
    pub pattern: String,
    /// The flags the command was parsed with.
    pub flags: SubFlags,
}

impl SubstituteOutcome {
    pub(crate) const fn nothing(pattern: String, flags: SubFlags) -> Self {
        Self {
            substitutions: 0,
            lines: 0,
            quit: false,
            cursor: None,
            printed: None,
            pattern,
            flags,
        }
    }

    /// Vim's summary message, e.g. `"3 substitutions on 2 lines"`.
    #[must_use]
    pub fn report(&self) -> Option<String> {
        if self.substitutions == 0 {
            return None;
        }
        let subs = if self.substitutions == 1 { "substitution" } else { "substitutions" };
        let lines = if self.lines == 1 { "line" } else { "lines" };
        Some(format!("{} {subs} on {} {lines}", self.substitutions, self.lines))
    }

    /// Turn "nothing matched" into E486, the way `:s` reports it. Quitting,
    /// the `e` flag, and commands that did nothing on purpose are not errors.
    ///
    /// # Errors
    ///
    /// [`SearchError::PatternNotFound`].
    pub fn check_found(&self) -> Result<(), SearchError> {
        if self.substitutions == 0
            && !self.quit
            && !self.pattern.is_empty()
            && !self.flags.contains(SubFlags::IGNORE_ERROR)
        {
            return Err(SearchError::PatternNotFound(self.pattern.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// The loop
// ---------------------------------------------------------------------------

/// Replace matches of `re` with `template` over `lines`.
///
/// `cursor` is recorded as a jump on the first match. The flags' `g` and `c`
/// may be changed by confirm answers for the rest of this run only.
pub fn execute(
    env: &mut SubstituteEnv<'_>,
    re: &Regexp,
    template: &str,
    lines: LineRange,
    flags: SubFlags,
    cursor: Position,
) -> SubstituteOutcome {
    let mut do_all = flags.contains(SubFlags::GLOBAL);
    let mut do_ask = flags.contains(SubFlags::CONFIRM);

    let mut outcome = SubstituteOutcome::nothing(re.pattern().to_string(), flags);
    let mut line2 = signed(lines.end);
    let mut lnum = lines.start;
    let mut col = 0;
    let mut got_match = false;
    // Line the last replacement started on, for "first match per line" and
    // the line count. Skipped matches are not recorded: without `g` the loop
    // leaves their line anyway.
    let mut last_line: Option<usize> = None;

    while signed(lnum) <= line2 && lnum < env.buffer.line_count() {
        let Some(m) = re.exec_multi(&*env.buffer, lnum, col) else {
            lnum += 1;
            col = 0;
            continue;
        };

        if !got_match {
            env.jumps.record_jump(cursor);
            got_match = true;
        }

        let text = re.expand(&m, template);
        let match_line = m.start().line;
        let mut replace = do_all || last_line != Some(match_line);

        if replace && do_ask {
            let choice = env.confirm.confirm_replace(m.span, &text);
            trace!(target: "substitute.exec", span = ?m.span, ?choice, "confirm");
            match choice {
                ConfirmChoice::Yes => {}
                ConfirmChoice::No => replace = false,
                ConfirmChoice::AllRemaining => do_ask = false,
                ConfirmChoice::Quit => {
                    outcome.quit = true;
                    break;
                }
                ConfirmChoice::LastThenStop => {
                    do_all = false;
                    line2 = signed(lnum);
                }
            }
        }

        let mut end = m.end();
        if replace {
            let start_off = env.buffer.logical_to_offset(m.start());
            let end_off = env.buffer.logical_to_offset(m.end());
            let new_end = env.buffer.replace_range(start_off, end_off, &text);
            let np = env.buffer.offset_to_logical(new_end);
            line2 += signed(np.line) - signed(m.end().line);

            if last_line != Some(match_line) {
                outcome.lines += 1;
            }
            last_line = Some(match_line);
            outcome.substitutions += 1;
            trace!(target: "substitute.exec", span = ?m.span, new_end = ?np, line2, "replaced");
            end = np;
        }

        if !do_all {
            lnum = end.line + 1;
            col = 0;
            continue;
        }

        lnum = end.line;
        col = end.col;
        let len = env.buffer.line_length(lnum);
        if m.span.is_empty() {
            col += 1;
        } else if col >= len && !re.is_multiline() {
            // Nothing left on this line for a single-line pattern.
            col = len + 1;
        }
        if col > len {
            lnum += 1;
            col = 0;
        }
    }

    if let Some(line) = last_line {
        outcome.cursor = Some(Position::new(line, env.buffer.first_non_blank(line)));
        if flags.contains(SubFlags::PRINT) {
            outcome.printed = Some(env.buffer.line_text(line));
        }
    }

    debug!(
        target: "substitute.exec",
        pattern = re.pattern(),
        substitutions = outcome.substitutions,
        lines = outcome.lines,
        quit = outcome.quit,
        "done"
    );
    outcome
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
