//! End-to-end searches: counts, wrapping, case rules and offsets.

use std::cell::Cell;

use n_search::buffer::{Buffer, TextBuffer};
use n_search::options::SearchOptions;
use n_search::search::{self, CaseMode, SearchEnv};
use n_search::{PatternState, Position, SearchDirection, SearchError};
use pretty_assertions::assert_eq;

use SearchDirection::{Backward, Forward};

fn pos(line: usize, col: usize) -> Position {
    Position::new(line, col)
}

fn nowrapscan() -> SearchOptions {
    SearchOptions { wrapscan: false, ..SearchOptions::default() }
}

fn smartcase() -> SearchOptions {
    SearchOptions { ignorecase: true, smartcase: true, ..SearchOptions::default() }
}

// -- Counts -----------------------------------------------------------------

#[test]
fn count_equals_repeated_single_steps() {
    let buf = Buffer::from_text("foo\nbar foo\nfoo foo\nbaz\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);

    for (dir, start, expected) in [(Forward, pos(0, 0), pos(2, 4)), (Backward, pos(3, 0), pos(1, 4))] {
        let mut st = PatternState::new();
        let counted = search::search(&mut st, env, "foo", start, 3, dir).unwrap();

        let mut st = PatternState::new();
        let mut at = start;
        for _ in 0..3 {
            at = search::search(&mut st, env, "foo", at, 1, dir).unwrap().pos;
        }

        assert_eq!(counted.pos, at, "{dir:?}");
        assert_eq!(counted.pos, expected, "{dir:?}");
    }
}

#[test]
fn count_past_last_match_wraps() {
    let buf = Buffer::from_text("x foo\nfoo\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);
    let mut st = PatternState::new();

    let hit = search::search(&mut st, env, "foo", pos(0, 0), 3, Forward).unwrap();
    assert_eq!(hit.pos, pos(0, 2));
    assert!(hit.wrapped);
}

// -- Wrapscan ---------------------------------------------------------------

#[test]
fn match_before_cursor_found_only_with_wrapscan() {
    let buf = Buffer::from_text("foo\nbar\nbaz\n");

    let opts = SearchOptions::default();
    let mut st = PatternState::new();
    let hit = search::search(&mut st, SearchEnv::new(&buf, &opts), "foo", pos(2, 0), 1, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(0, 0));
    assert!(hit.wrapped);

    let opts = nowrapscan();
    let mut st = PatternState::new();
    let err = search::search(&mut st, SearchEnv::new(&buf, &opts), "foo", pos(2, 0), 1, Forward)
        .unwrap_err();
    assert_eq!(err, SearchError::HitBottom("foo".into()));
    assert!(err.is_not_found());

    let err = search::search(&mut st, SearchEnv::new(&buf, &opts), "baz", pos(0, 0), 1, Backward)
        .unwrap_err();
    assert_eq!(err, SearchError::HitTop("baz".into()));
}

#[test]
fn only_match_is_found_again_from_itself() {
    let buf = Buffer::from_text("foo\nbar\n");
    let opts = SearchOptions::default();
    let mut st = PatternState::new();

    let hit = search::search(&mut st, SearchEnv::new(&buf, &opts), "foo", pos(0, 0), 1, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(0, 0));
    assert!(hit.wrapped);
}

#[test]
fn not_found_with_wrapscan() {
    let buf = Buffer::from_text("foo\n");
    let opts = SearchOptions::default();
    let mut st = PatternState::new();

    let err = search::search(&mut st, SearchEnv::new(&buf, &opts), "zzz", pos(0, 0), 1, Forward)
        .unwrap_err();
    assert_eq!(err, SearchError::PatternNotFound("zzz".into()));
    // A search that finds nothing is still remembered for `n`.
    assert_eq!(st.last_search(), Some("zzz"));
}

// -- Case -------------------------------------------------------------------

#[test]
fn smartcase_uppercase_pattern_matches_case() {
    let opts = smartcase();

    let buf = Buffer::from_text("foo\n");
    let env = SearchEnv::new(&buf, &opts);
    assert!(search::find_matches(env, "Foo", pos(0, 0), Forward, 1, CaseMode::Options).is_err());

    let buf = Buffer::from_text("Foo\n");
    let env = SearchEnv::new(&buf, &opts);
    let hit = search::find_matches(env, "foo", pos(0, 0), Forward, 1, CaseMode::Options).unwrap();
    assert_eq!(hit.span.start, pos(0, 0));
}

#[test]
fn star_ignores_smartcase() {
    let buf = Buffer::from_text("Foo foo\n");
    let opts = smartcase();
    let mut st = PatternState::new();

    let hit = search::search_word(&mut st, SearchEnv::new(&buf, &opts), pos(0, 1), 1, true, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(0, 4));
    assert_eq!(st.last_search(), Some("\\<Foo\\>"));
}

// -- Offsets ----------------------------------------------------------------

#[test]
fn line_offset_lands_on_first_non_blank() {
    let buf = Buffer::from_text("x\nfoo\ny\n    z\n");
    let opts = SearchOptions::default();
    let mut st = PatternState::new();

    let hit = search::search(&mut st, SearchEnv::new(&buf, &opts), "foo/+2", pos(0, 0), 1, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(3, 4));
    assert_eq!(hit.span.start, pos(1, 0));
}

#[test]
fn end_offset_lands_past_last_char() {
    let buf = Buffer::from_text("hello world\n");
    let opts = SearchOptions::default();
    let mut st = PatternState::new();

    let hit = search::search(&mut st, SearchEnv::new(&buf, &opts), "wor/e+1", pos(0, 0), 1, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(0, 9));
}

#[test]
fn chained_offset_searches_again() {
    let buf = Buffer::from_text("x foo bar\nbar\n");
    let opts = SearchOptions::default();
    let mut st = PatternState::new();

    let hit = search::search(&mut st, SearchEnv::new(&buf, &opts), "foo/;/bar", pos(0, 0), 1, Forward)
        .unwrap();
    assert_eq!(hit.pos, pos(0, 6));
    assert_eq!(st.last_search(), Some("bar"));
}

#[test]
fn next_reuses_offset() {
    let buf = Buffer::from_text("foo foo\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);
    let mut st = PatternState::new();

    let hit = search::search(&mut st, env, "foo/e", pos(0, 0), 1, Forward).unwrap();
    assert_eq!(hit.pos, pos(0, 6));

    let hit = search::search_next(&mut st, env, hit.pos, 1).unwrap();
    assert_eq!(hit.pos, pos(0, 2));
    assert!(hit.wrapped);
}

// -- Direction --------------------------------------------------------------

#[test]
fn previous_does_not_change_direction() {
    let buf = Buffer::from_text("a\na\na\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);
    let mut st = PatternState::new();

    let hit = search::search(&mut st, env, "a", pos(2, 0), 1, Backward).unwrap();
    assert_eq!(hit.pos, pos(1, 0));

    let hit = search::search_previous(&mut st, env, hit.pos, 1).unwrap();
    assert_eq!(hit.pos, pos(2, 0));
    assert_eq!(st.last_direction(), Backward);

    let hit = search::search_next(&mut st, env, hit.pos, 1).unwrap();
    assert_eq!(hit.pos, pos(1, 0));
}

// -- Failures ---------------------------------------------------------------

#[test]
fn malformed_search_leaves_state_untouched() {
    let buf = Buffer::from_text("foo\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);
    let mut st = PatternState::new();
    search::search(&mut st, env, "foo/e", pos(0, 0), 1, Forward).unwrap();
    let before = st.clone();

    for command in ["a\\(b", "x\\{2", "\\zs"] {
        let err = search::search(&mut st, env, command, pos(0, 0), 1, Backward).unwrap_err();
        assert!(matches!(err, SearchError::PatternCompile { .. }), "{command}: {err}");
        assert_eq!(st, before, "{command}");
    }
}

#[test]
fn repeat_without_history() {
    let buf = Buffer::from_text("foo\n");
    let opts = SearchOptions::default();
    let env = SearchEnv::new(&buf, &opts);
    let mut st = PatternState::new();

    assert_eq!(
        search::search_next(&mut st, env, pos(0, 0), 1),
        Err(SearchError::NoPreviousPattern)
    );
    assert_eq!(
        search::search(&mut st, env, "", pos(0, 0), 1, Forward),
        Err(SearchError::NoPreviousPattern)
    );
    assert_eq!(st, PatternState::new());
}

// -- Cost -------------------------------------------------------------------

/// A buffer that counts the chars it hands out.
struct Counting {
    inner: Buffer,
    copied: Cell<usize>,
}

impl Counting {
    fn new(text: &str) -> Self {
        Self { inner: Buffer::from_text(text), copied: Cell::new(0) }
    }

    fn count(&self, text: String) -> String {
        self.copied.set(self.copied.get() + text.chars().count());
        text
    }
}

impl TextBuffer for Counting {
    fn line_count(&self) -> usize {
        self.inner.line_count()
    }

    fn line_text(&self, line: usize) -> String {
        self.count(self.inner.line_text(line))
    }

    fn line_length(&self, line: usize) -> usize {
        self.inner.line_length(line)
    }

    fn logical_to_offset(&self, pos: Position) -> usize {
        self.inner.logical_to_offset(pos)
    }

    fn offset_to_logical(&self, offset: usize) -> Position {
        self.inner.offset_to_logical(offset)
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        self.count(self.inner.text_range(start, end))
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> usize {
        self.inner.replace_range(start, end, text)
    }

    fn file_size(&self) -> usize {
        self.inner.file_size()
    }

    fn revision(&self) -> u64 {
        self.inner.revision()
    }
}

#[test]
fn multi_line_search_reads_buffer_a_bounded_number_of_times() {
    let text = "some line of filler text\n".repeat(3000);
    let opts = SearchOptions::default();

    for pattern in ["zzz\\nqqq", "zzz\\_s*qqq"] {
        let buf = Counting::new(&text);
        let mut st = PatternState::new();
        let err = search::search(&mut st, SearchEnv::new(&buf, &opts), pattern, pos(1500, 0), 1, Forward)
            .unwrap_err();
        assert_eq!(err, SearchError::PatternNotFound(pattern.into()));
        assert!(
            buf.copied.get() <= 5 * buf.file_size(),
            "{pattern}: read {} chars of a {} char buffer",
            buf.copied.get(),
            buf.file_size()
        );
    }
}
