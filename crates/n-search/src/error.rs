//! Errors reported by searches and substitutions.
//!
//! Messages carry Vim's error numbers so a host can show them verbatim on
//! its message line.

use thiserror::Error;

/// Everything that can go wrong parsing or running a search / substitute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("E146: Regular expressions can't be delimited by letters")]
    InvalidDelimiter,

    #[error("E10: \\ should be followed by /, ? or &")]
    InvalidEscape,

    #[error("E35: No previous regular expression")]
    NoPreviousPattern,

    #[error("E33: No previous substitute regular expression")]
    NoPreviousSubstitute,

    #[error("E383: Invalid search string: {pattern} ({reason})")]
    PatternCompile { pattern: String, reason: String },

    #[error("E939: Positive count required")]
    ZeroCount,

    #[error("E488: Trailing characters: {0}")]
    TrailingCharacters(String),

    #[error("E486: Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("E384: search hit TOP without match for: {0}")]
    HitTop(String),

    #[error("E385: search hit BOTTOM without match for: {0}")]
    HitBottom(String),

    #[error("E348: No string under cursor")]
    NoStringUnderCursor,

    #[error("E14: Invalid address")]
    InvalidAddress,

    #[error("E492: Not an editor command: {0}")]
    NotACommand(String),

    #[error("E518: Unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl SearchError {
    /// True for the "no match" outcomes: a normal, reportable result rather
    /// than a malformed command.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PatternNotFound(_) | Self::HitTop(_) | Self::HitBottom(_)
        )
    }
}
