//! Jump history — where the cursor was before a search or substitution moved it.
//!
//! The engine only ever *records* jumps, through [`JumpRecorder`]. A
//! substitution records the cursor once, on its first match; a search records
//! it when the caller moves the cursor to the hit. Navigating the history is
//! up to the host.

use std::collections::VecDeque;

use crate::position::Position;

/// Maximum number of entries kept (matches Vim).
const JUMPLIST_MAX: usize = 100;

/// Something that remembers jump locations.
pub trait JumpRecorder {
    fn record_jump(&mut self, pos: Position);
}

/// A recorder that forgets everything, for callers with no jump history.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJumps;

impl JumpRecorder for NoJumps {
    fn record_jump(&mut self, _pos: Position) {}
}

/// Recorded jumps, oldest first. A jump on the same line as the newest
/// entry replaces it; past [`JUMPLIST_MAX`] the oldest entry is dropped.
#[derive(Debug, Default)]
pub struct JumpList {
    entries: VecDeque<Position>,
}

impl JumpList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, pos: Position) {
        if let Some(last) = self.entries.back_mut().filter(|last| last.line == pos.line) {
            *last = pos;
            return;
        }
        if self.entries.len() == JUMPLIST_MAX {
            self.entries.pop_front();
        }
        self.entries.push_back(pos);
    }

    /// The most recently recorded position.
    #[must_use]
    pub fn last(&self) -> Option<Position> {
        self.entries.back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl JumpRecorder for JumpList {
    fn record_jump(&mut self, pos: Position) {
        self.push(pos);
    }
}
