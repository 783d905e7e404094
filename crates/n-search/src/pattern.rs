//! Pattern state — the "last pattern" memory shared by `/`, `?`, `n`, `:s`, `&`, `~`.
//!
//! Vim keeps several independent memories, and which one a command falls
//! back to depends on how it was written:
//!
//! | Memory            | Set by                  | Used by                      |
//! |-------------------|-------------------------|------------------------------|
//! | last search       | `/` `?` `*` `#`         | `n` `N`, `:s\/`, `:s\?`       |
//! | last substitute   | `:s/pat/`               | `:s` `:&`, `:s\&`             |
//! | last pattern      | both                    | `:~`, `:s//` (empty pattern) |
//! | last replacement  | `:s/pat/rep/`           | `~` in a replacement, `:&`   |
//!
//! [`PatternState`] is owned by the caller (one per editing session) and
//! passed by `&mut`. Only the search engine and the substitute parser write
//! to it, and only after a command has parsed and compiled.

use crate::substitute::SubFlags;

// ---------------------------------------------------------------------------
// SearchDirection
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// The command character that starts a search this way: `/` or `?`.
    #[must_use]
    pub const fn delimiter(self) -> char {
        match self {
            Self::Forward => '/',
            Self::Backward => '?',
        }
    }

    #[must_use]
    pub const fn from_delimiter(c: char) -> Option<Self> {
        match c {
            '/' => Some(Self::Forward),
            '?' => Some(Self::Backward),
            _ => None,
        }
    }

    /// Line step: `+1` forward, `-1` backward.
    #[must_use]
    pub const fn step(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

// ---------------------------------------------------------------------------
// PatternFamily
// ---------------------------------------------------------------------------

/// Which memory an empty pattern falls back to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PatternFamily {
    /// The last `/` or `?` pattern.
    Search,
    /// The last `:s` pattern.
    Substitute,
    /// Whichever of the two was used most recently.
    LastUsed,
}

// ---------------------------------------------------------------------------
// PatternState
// ---------------------------------------------------------------------------

/// Session memory of the last search and substitute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternState {
    last_search: Option<String>,
    last_pattern: Option<String>,
    last_substitute: Option<String>,
    last_replace: Option<String>,
    last_offset: String,
    last_direction: SearchDirection,
    last_flags: SubFlags,
}

impl PatternState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The pattern of the last search command.
    #[must_use]
    pub fn last_search(&self) -> Option<&str> {
        self.last_search.as_deref()
    }

    /// The most recently used pattern, search or substitute.
    #[must_use]
    pub fn last_pattern(&self) -> Option<&str> {
        self.last_pattern.as_deref()
    }

    /// The pattern of the last substitute command.
    #[must_use]
    pub fn last_substitute(&self) -> Option<&str> {
        self.last_substitute.as_deref()
    }

    /// The last replacement text, with its own `~` already expanded.
    #[must_use]
    pub fn last_replace(&self) -> Option<&str> {
        self.last_replace.as_deref()
    }

    /// The raw offset of the last search command (`e+1`, `;/foo`, …).
    #[must_use]
    pub fn last_offset(&self) -> &str {
        &self.last_offset
    }

    #[must_use]
    pub const fn last_direction(&self) -> SearchDirection {
        self.last_direction
    }

    /// Flags of the last substitute, reused by `:s&` and `:&&`.
    #[must_use]
    pub const fn last_flags(&self) -> SubFlags {
        self.last_flags
    }

    /// The remembered pattern an empty pattern falls back to.
    #[must_use]
    pub fn last_by(&self, family: PatternFamily) -> Option<&str> {
        match family {
            PatternFamily::Search => self.last_search(),
            PatternFamily::Substitute => self.last_substitute(),
            PatternFamily::LastUsed => self.last_pattern(),
        }
    }

    // -- Writers (search engine and substitute parser only) ----------------

    pub(crate) fn record_search(&mut self, pattern: &str, offset: &str, dir: SearchDirection) {
        self.last_search = Some(pattern.to_string());
        self.last_pattern = Some(pattern.to_string());
        self.last_offset = offset.to_string();
        self.last_direction = dir;
    }

    pub(crate) fn record_substitute(&mut self, pattern: &str, replace: &str, flags: SubFlags) {
        self.last_substitute = Some(pattern.to_string());
        self.last_pattern = Some(pattern.to_string());
        self.last_replace = Some(replace.to_string());
        self.last_flags = flags;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_helpers() {
        assert_eq!(SearchDirection::Forward.opposite(), SearchDirection::Backward);
        assert_eq!(SearchDirection::Backward.delimiter(), '?');
        assert_eq!(SearchDirection::from_delimiter('/'), Some(SearchDirection::Forward));
        assert_eq!(SearchDirection::from_delimiter('#'), None);
        assert_eq!(SearchDirection::Backward.step(), -1);
    }

    #[test]
    fn fresh_state_is_empty() {
        let st = PatternState::new();
        assert_eq!(st.last_search(), None);
        assert_eq!(st.last_pattern(), None);
        assert_eq!(st.last_offset(), "");
        assert_eq!(st.last_direction(), SearchDirection::Forward);
    }

    #[test]
    fn search_and_substitute_share_last_pattern() {
        let mut st = PatternState::new();
        st.record_search("foo", "e", SearchDirection::Backward);
        assert_eq!(st.last_by(PatternFamily::LastUsed), Some("foo"));

        st.record_substitute("bar", "baz", SubFlags::GLOBAL);
        assert_eq!(st.last_by(PatternFamily::Search), Some("foo"));
        assert_eq!(st.last_by(PatternFamily::Substitute), Some("bar"));
        assert_eq!(st.last_by(PatternFamily::LastUsed), Some("bar"));
        assert_eq!(st.last_replace(), Some("baz"));
        assert_eq!(st.last_offset(), "e");
        assert_eq!(st.last_flags(), SubFlags::GLOBAL);
    }
}
