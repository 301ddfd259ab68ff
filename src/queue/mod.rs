// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-session navigation buffer with a scroll cursor.

use std::collections::VecDeque;

use crate::model::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Older,
    Newer,
}

/// Bounded, most-recent-first command buffer.
///
/// Positions are 1-based: position 1 is the most recent command. The cursor is paired with the
/// direction of the last scroll step; reversing direction moves one extra step so a single pair
/// of scroll keys behaves like a two-way list even though the displayed entry trails the cursor
/// by one while scrolling newer.
#[derive(Debug, Clone)]
pub struct NavQueue {
    items: VecDeque<String>,
    cap: usize,
    keep_duplicates: bool,
    cursor: usize,
    last: Option<Direction>,
}

impl NavQueue {
    pub fn new(cap: usize, keep_duplicates: bool) -> Self {
        let cap = cap.max(1);
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
            keep_duplicates,
            cursor: 0,
            last: None,
        }
    }

    /// Builds a queue from durable entries given most recent first.
    pub fn seeded(cap: usize, keep_duplicates: bool, recent: &[HistoryEntry]) -> Self {
        let mut queue = Self::new(cap, keep_duplicates);
        for entry in recent.iter().take(queue.cap).rev() {
            queue.insert(entry.command());
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.last
    }

    pub fn is_navigating(&self) -> bool {
        self.last.is_some()
    }

    /// Pushes `command` as the most recent entry. Returns `false` when it collapsed into an
    /// identical head.
    pub fn insert(&mut self, command: &str) -> bool {
        if !self.keep_duplicates && self.items.front().is_some_and(|head| head == command) {
            return false;
        }
        self.items.push_front(command.to_owned());
        self.items.truncate(self.cap);
        true
    }

    /// The command at 1-based `position`, most recent first.
    pub fn at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|idx| self.items.get(idx))
            .map(String::as_str)
    }

    /// Steps the cursor and returns the entry now displayed, if any.
    pub fn advance(&mut self, direction: Direction) -> Option<&str> {
        let n = self.items.len();
        let (cursor, last) = match (self.last, direction) {
            (None, Direction::Older) if n == 0 => (0, None),
            (None, Direction::Older) => (1, Some(Direction::Older)),
            (None, Direction::Newer) => (0, None),
            (Some(Direction::Older), Direction::Older) => {
                ((self.cursor + 1).min(n), Some(Direction::Older))
            }
            (Some(Direction::Newer), Direction::Older) => {
                ((self.cursor + 2).min(n), Some(Direction::Older))
            }
            (Some(Direction::Older), Direction::Newer) => match self.cursor.checked_sub(2) {
                Some(c) => (c, Some(Direction::Newer)),
                None => (0, None),
            },
            (Some(Direction::Newer), Direction::Newer) => match self.cursor.checked_sub(1) {
                Some(c) => (c, Some(Direction::Newer)),
                None => (0, None),
            },
        };
        self.cursor = cursor;
        self.last = last;
        self.displayed()
    }

    pub fn displayed_position(&self) -> Option<usize> {
        match self.last? {
            Direction::Older => Some(self.cursor),
            Direction::Newer => Some(self.cursor + 1),
        }
    }

    pub fn displayed(&self) -> Option<&str> {
        self.displayed_position().and_then(|pos| self.at(pos))
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last = None;
    }

    /// Overwrites the displayed entry, e.g. with text returned from the external editor.
    pub fn replace_at_cursor(&mut self, command: &str) -> bool {
        let Some(idx) = self.displayed_position().and_then(|pos| pos.checked_sub(1)) else {
            return false;
        };
        match self.items.get_mut(idx) {
            Some(slot) => {
                command.clone_into(slot);
                true
            }
            None => false,
        }
    }

    /// Drops the most recent occurrence of `command`, wherever it sits.
    pub fn remove_latest(&mut self, command: &str) -> bool {
        let Some(idx) = self.items.iter().position(|item| item == command) else {
            return false;
        };
        self.items.remove(idx);
        self.reset();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.reset();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests;
