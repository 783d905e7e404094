//! # n-search — Vim-compatible search and substitute
//!
//! The engine behind `/`, `?`, `n`, `N`, `*`, `#` and `:s` / `:&` / `:~`:
//!
//! - **[`pattern`]** — `PatternState`, the remembered patterns, offset,
//!   direction and flags shared by searches and substitutions
//! - **[`search`]** — pattern search with counts, `wrapscan` and `smartcase`
//! - **[`offset`]** — search offsets (`/foo/e+1`, `/foo/;/bar`)
//! - **[`substitute`]** — `:s` parsing: delimiters, `~` expansion, flags, count
//! - **[`executor`]** — the replace loop, with confirmation and range re-basing
//! - **[`command`]** — ex command lines and line ranges
//!
//! The host supplies the text and settings through two traits,
//! [`buffer::TextBuffer`] and [`options::OptionSource`]; [`buffer::Buffer`]
//! and [`options::SearchOptions`] are rope- and TOML-backed implementations.
//! Confirm prompts and the jump list are the [`executor::Confirm`] and
//! [`jumplist::JumpRecorder`] traits.
//!
//! Nothing here is global: the caller owns the [`pattern::PatternState`] and
//! passes it to every operation.

pub mod buffer;
pub mod command;
pub mod error;
pub mod executor;
pub mod jumplist;
pub mod offset;
pub mod options;
pub mod pattern;
pub mod position;
pub mod regexp;
pub mod search;
pub mod substitute;

pub use error::SearchError;
pub use pattern::{PatternState, SearchDirection};
pub use position::{LineRange, Position, Range};
