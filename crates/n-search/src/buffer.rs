//! Text buffers — the host side of every search and substitution.
//!
//! The engine never touches storage directly. It talks to a [`TextBuffer`]:
//! a line-addressed view with char offsets and a single mutation,
//! [`replace_range`](TextBuffer::replace_range). Anything that can answer
//! those questions (an editor's document model, a test fixture) can be
//! searched and substituted.
//!
//! [`Buffer`] is the stock implementation, a [`ropey::Rope`] with file I/O.
//!
//! # Lines
//!
//! A file ending in a line break does **not** get a phantom empty last line
//! here: `"a\nb\n"` has two lines, as in Vim. Addresses such as `$` and `%`
//! rely on that.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

use crate::position::Position;

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

/// Line/offset access to a text buffer.
///
/// Offsets are char indices from the start of the buffer. Columns are char
/// offsets within a line, excluding its line ending.
pub trait TextBuffer {
    /// Number of lines. Never zero: an empty buffer has one empty line.
    fn line_count(&self) -> usize;

    /// Text of `line` without its line ending. Empty for out-of-range lines.
    fn line_text(&self, line: usize) -> String;

    /// Char length of `line` without its line ending.
    fn line_length(&self, line: usize) -> usize;

    /// Convert a position to a char offset. The line is clamped to the last
    /// line and the column to the line's content length.
    fn logical_to_offset(&self, pos: Position) -> usize;

    /// Convert a char offset (clamped to [`file_size`](Self::file_size)) to
    /// a position.
    fn offset_to_logical(&self, offset: usize) -> Position;

    /// Text between two char offsets, line breaks included.
    fn text_range(&self, start: usize, end: usize) -> String;

    /// Replace `[start, end)` with `text`. `"\n"` in `text` starts a new
    /// line. Returns the char offset just past the inserted text.
    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> usize;

    /// Total number of chars.
    fn file_size(&self) -> usize;

    /// A counter that changes whenever the text does. [`Buffer`] draws it
    /// from a process-wide sequence, so no two of its states share one.
    fn revision(&self) -> u64;

    /// Column of the first non-blank char of `line`, or the line's length if
    /// it is blank.
    fn first_non_blank(&self, line: usize) -> usize {
        self.line_text(line)
            .chars()
            .position(|c| c != ' ' && c != '\t')
            .unwrap_or_else(|| self.line_length(line))
    }

    /// Clamp a line number into the buffer.
    fn normalize_line(&self, line: isize) -> usize {
        let last = self.line_count().saturating_sub(1);
        usize::try_from(line).map_or(0, |l| l.min(last))
    }
}

// ---------------------------------------------------------------------------
// Line ending detection
// ---------------------------------------------------------------------------

/// Line ending style of a file, detected from its first line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// The style of the first line break in `text`, `Lf` if there is none.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if i > 0 && text.as_bytes()[i - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => f.write_str("LF"),
            Self::CrLf => f.write_str("CRLF"),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

fn next_revision() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// A rope-backed text buffer.
///
/// Line breaks inserted through [`replace_range`](TextBuffer::replace_range)
/// follow the buffer's detected [`LineEnding`], so a substitution with `\r`
/// in a CRLF file keeps the file CRLF.
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    modified: bool,
    revision: u64,
    line_ending: LineEnding,
}

impl Buffer {
    /// Create an empty buffer with no file path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            modified: false,
            revision: next_revision(),
            line_ending: LineEnding::Lf,
        }
    }

    /// Create a buffer from a string.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            line_ending: LineEnding::detect(text),
            rope: Rope::from_str(text),
            path: None,
            modified: false,
            revision: next_revision(),
        }
    }

    /// Load a buffer from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid UTF-8.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut buf = Self::from_text(&text);
        buf.path = Some(path.to_path_buf());
        Ok(buf)
    }

    /// The whole text as a `String`.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True if a replacement has been applied since load.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Write the buffer to `path` and clear the modified flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_as(&mut self, path: &Path) -> io::Result<()> {
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        self.rope.write_to(&mut file)?;
        io::Write::flush(&mut file)?;
        self.path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// True when the last char is a line break, in which case the rope's
    /// trailing empty line is not a real line.
    fn ends_with_break(&self) -> bool {
        let len = self.rope.len_chars();
        len > 0 && matches!(self.rope.char(len - 1), '\n' | '\r')
    }
}

impl TextBuffer for Buffer {
    fn line_count(&self) -> usize {
        let lines = self.rope.len_lines();
        if self.ends_with_break() {
            lines - 1
        } else {
            lines
        }
    }

    fn line_text(&self, line: usize) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        let s: String = self.rope.line(line).chars().collect();
        s.trim_end_matches(['\n', '\r']).to_string()
    }

    fn line_length(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        while len > 0 && matches!(slice.char(len - 1), '\n' | '\r') {
            len -= 1;
        }
        len
    }

    fn logical_to_offset(&self, pos: Position) -> usize {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line) + pos.col.min(self.line_length(line))
    }

    fn offset_to_logical(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let col = offset - self.rope.line_to_char(line);
        // The offset past a final line break belongs to the last real line.
        if line >= self.line_count() && line > 0 {
            let last = line - 1;
            return Position::new(last, self.line_length(last));
        }
        Position::new(line, col)
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> usize {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        let text = match self.line_ending {
            LineEnding::Lf => text.to_string(),
            LineEnding::CrLf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        };
        self.rope.remove(start..end);
        self.rope.insert(start, &text);
        self.modified = true;
        self.revision = next_revision();
        start + text.chars().count()
    }

    fn file_size(&self) -> usize {
        self.rope.len_chars()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.line_count())
            .field("chars", &self.rope.len_chars())
            .field("modified", &self.modified)
            .field("line_ending", &self.line_ending)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
