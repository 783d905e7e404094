//! End-to-end substitutions driven through ex command lines.

use std::collections::VecDeque;

use n_search::buffer::{Buffer, TextBuffer as _};
use n_search::command::{ExCommand, parse_ex};
use n_search::executor::{Confirm, ConfirmChoice, SubstituteEnv, SubstituteOutcome};
use n_search::jumplist::JumpRecorder;
use n_search::options::SearchOptions;
use n_search::search::{self, SearchEnv};
use n_search::substitute::substitute;
use n_search::{PatternState, Position, Range, SearchDirection, SearchError};
use pretty_assertions::assert_eq;

fn pos(line: usize, col: usize) -> Position {
    Position::new(line, col)
}

/// Answers prompts from a script and records what was asked. Runs out as `q`.
#[derive(Default)]
struct Script {
    answers: VecDeque<ConfirmChoice>,
    asked: Vec<(Range, String)>,
}

impl Confirm for Script {
    fn confirm_replace(&mut self, span: Range, replacement: &str) -> ConfirmChoice {
        self.asked.push((span, replacement.to_string()));
        self.answers.pop_front().unwrap_or(ConfirmChoice::Quit)
    }
}

#[derive(Default)]
struct Jumps(Vec<Position>);

impl JumpRecorder for Jumps {
    fn record_jump(&mut self, pos: Position) {
        self.0.push(pos);
    }
}

/// A buffer with its options, pattern history and collaborators.
struct Session {
    buf: Buffer,
    opts: SearchOptions,
    state: PatternState,
    script: Script,
    jumps: Jumps,
    cursor: Position,
}

impl Session {
    fn new(text: &str) -> Self {
        Self {
            buf: Buffer::from_text(text),
            opts: SearchOptions::default(),
            state: PatternState::new(),
            script: Script::default(),
            jumps: Jumps::default(),
            cursor: Position::ZERO,
        }
    }

    fn answers(mut self, answers: &[ConfirmChoice]) -> Self {
        self.script.answers = answers.iter().copied().collect();
        self
    }

    fn ex(&mut self, line: &str) -> Result<SubstituteOutcome, SearchError> {
        let Ok(ExCommand::Substitute { range, excmd, arg }) = parse_ex(line) else {
            panic!("not a substitute: {line}");
        };
        let lines = range.resolve(self.cursor.line, self.buf.line_count(), None)?;
        let mut env = SubstituteEnv {
            buffer: &mut self.buf,
            options: &self.opts,
            confirm: &mut self.script,
            jumps: &mut self.jumps,
        };
        let outcome = substitute(&mut self.state, &mut env, excmd, &arg, lines, self.cursor)?;
        if let Some(cursor) = outcome.cursor {
            self.cursor = cursor;
        }
        Ok(outcome)
    }

    fn text(&self) -> String {
        self.buf.contents()
    }
}

// -- Confirm ----------------------------------------------------------------

#[test]
fn confirm_yes_no_all() {
    use ConfirmChoice::{AllRemaining, No, Yes};
    let mut s = Session::new("a a a a\n").answers(&[Yes, No, AllRemaining]);

    let outcome = s.ex("s/a/b/gc").unwrap();

    assert_eq!(s.text(), "b a b b\n");
    assert_eq!(outcome.substitutions, 3);
    assert_eq!(s.script.asked.len(), 3);
    assert_eq!(s.script.asked[1].0, Range::new(pos(0, 2), pos(0, 3)));
    assert_eq!(s.script.asked[1].1, "b");
}

#[test]
fn confirm_quit_keeps_earlier_replacements() {
    use ConfirmChoice::{Quit, Yes};
    let mut s = Session::new("a\na\na\n").answers(&[Yes, Quit]);

    let outcome = s.ex("%s/a/b/c").unwrap();

    assert_eq!(s.text(), "b\na\na\n");
    assert!(outcome.quit);
    assert_eq!(outcome.report(), Some("1 substitution on 1 line".into()));
    assert_eq!(outcome.check_found(), Ok(()));
}

#[test]
fn confirm_answers_do_not_persist() {
    use ConfirmChoice::{AllRemaining, Yes};
    let mut s = Session::new("a\na\n").answers(&[AllRemaining, Yes]);

    s.ex("s/a/b/c").unwrap();
    s.cursor = pos(1, 0);
    s.ex("&&").unwrap();

    assert_eq!(s.text(), "b\nb\n");
    assert_eq!(s.script.asked.len(), 2);
}

// -- Ranges -----------------------------------------------------------------

#[test]
fn range_grows_with_inserted_lines() {
    let mut s = Session::new("a,b\nc,d\ne,f\n");

    let outcome = s.ex("1,2s/,/\\r/").unwrap();

    assert_eq!(s.text(), "a\nb\nc\nd\ne,f\n");
    assert_eq!(outcome.substitutions, 2);
    assert_eq!(outcome.lines, 2);
    assert_eq!(s.cursor, pos(2, 0));
}

#[test]
fn cursor_stays_on_line_where_replacement_starts() {
    let mut s = Session::new("  a\nb\n");

    s.ex("s/a/x\\ry/").unwrap();

    assert_eq!(s.text(), "  x\ny\nb\n");
    assert_eq!(s.cursor, pos(0, 2));
}

#[test]
fn count_starts_at_range_end() {
    let mut s = Session::new("a\na\na\na\n");
    s.cursor = pos(1, 0);

    s.ex("s/a/b/ 2").unwrap();

    assert_eq!(s.text(), "a\nb\nb\na\n");
}

#[test]
fn out_of_range_address() {
    let mut s = Session::new("a\n");
    assert_eq!(s.ex("5s/a/b/"), Err(SearchError::InvalidAddress));
}

// -- Replacement history ----------------------------------------------------

#[test]
fn tilde_expands_once() {
    let mut s = Session::new("a a\n");

    // Sets the previous replacement without touching the text.
    s.ex("s/q/Z/e").unwrap();
    s.ex("s/a/x~y/").unwrap();
    assert_eq!(s.text(), "xZy a\n");
    assert_eq!(s.state.last_replace(), Some("xZy"));

    s.ex("&&").unwrap();
    assert_eq!(s.text(), "xZy xZy\n");
    assert_eq!(s.state.last_replace(), Some("xZy"));
}

#[test]
fn ampersand_flag_keeps_previous_flags() {
    let mut s = Session::new("a a\na a\n");

    s.ex("s/a/b/g").unwrap();
    s.cursor = pos(1, 0);
    s.ex("&&").unwrap();

    assert_eq!(s.text(), "b b\nb b\n");
}

#[test]
fn empty_pattern_uses_last_search() {
    let mut s = Session::new("foo bar\nbar\n");
    let hit = search::search(
        &mut s.state,
        SearchEnv::new(&s.buf, &s.opts),
        "bar",
        pos(0, 0),
        1,
        SearchDirection::Forward,
    )
    .unwrap();
    assert_eq!(hit.pos, pos(0, 4));

    s.ex("%s//X/").unwrap();

    assert_eq!(s.text(), "foo X\nX\n");
    assert_eq!(s.state.last_substitute(), Some("bar"));
}

#[test]
fn gdefault_inverts_g() {
    let mut s = Session::new("a a\na a\n");
    s.opts.gdefault = true;

    s.ex("s/a/b/").unwrap();
    s.cursor = pos(1, 0);
    s.ex("s/a/b/g").unwrap();

    assert_eq!(s.text(), "b b\nb a\n");
}

// -- Outcome ----------------------------------------------------------------

#[test]
fn first_match_records_one_jump() {
    let mut s = Session::new("a\nx\na\n");
    s.cursor = pos(1, 0);

    s.ex("%s/a/b/").unwrap();

    assert_eq!(s.jumps.0, vec![pos(1, 0)]);
}

#[test]
fn cursor_lands_on_first_non_blank_of_last_line() {
    let mut s = Session::new("a\n    a\nc\n");

    let outcome = s.ex("%s/a/b/p").unwrap();

    assert_eq!(outcome.cursor, Some(pos(1, 4)));
    assert_eq!(outcome.printed.as_deref(), Some("    b"));
    assert_eq!(outcome.report(), Some("2 substitutions on 2 lines".into()));
}

#[test]
fn nothing_replaced_is_reported_unless_e() {
    let mut s = Session::new("abc\n");

    let outcome = s.ex("%s/x/y/").unwrap();
    assert_eq!(outcome.check_found(), Err(SearchError::PatternNotFound("x".into())));

    let outcome = s.ex("%s/x/y/e").unwrap();
    assert_eq!(outcome.check_found(), Ok(()));
    assert_eq!(s.text(), "abc\n");
}

// -- Failures ---------------------------------------------------------------

#[test]
fn malformed_commands_leave_state_untouched() {
    let mut s = Session::new("a\n");
    s.ex("s/a/b/").unwrap();
    let before = s.state.clone();

    for (line, expected) in [
        ("s a/b/", Some(SearchError::TrailingCharacters("a/b/".into()))),
        ("s\\x", Some(SearchError::InvalidEscape)),
        ("s/a/b/ 0", Some(SearchError::ZeroCount)),
        ("s/a/b/gz", Some(SearchError::TrailingCharacters("z".into()))),
        ("s/a\\(/b/", None),
    ] {
        let err = s.ex(line).unwrap_err();
        if let Some(expected) = expected {
            assert_eq!(err, expected, "{line}");
        }
        assert_eq!(s.state, before, "{line}");
    }
    assert_eq!(s.text(), "b\n");
}

#[test]
fn repeat_without_history() {
    let mut s = Session::new("a\n");
    assert_eq!(s.ex("&"), Err(SearchError::NoPreviousSubstitute));
    assert_eq!(s.state, PatternState::new());
}
