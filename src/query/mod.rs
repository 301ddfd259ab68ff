// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-side queries over a history snapshot.
//!
//! Every function here takes entries oldest first, as returned by
//! [`DurableStore::entries`](crate::store::DurableStore::entries). Listing indices are 1-based in
//! that order; negative indices count back from the most recent entry (`-1` is the last one).

use std::fmt;

use crate::model::HistoryEntry;

mod render;
mod search;

pub use render::{render_lines, RenderOptions};
pub use search::{search, SearchMode, DEFAULT_FUZZY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListRange {
    #[default]
    All,
    /// The `n` most recent entries.
    Last(usize),
    /// Inclusive index range; either end may be negative.
    Span { from: i64, to: i64 },
}

/// An entry together with its listing index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listed<'a> {
    pub index: usize,
    pub entry: &'a HistoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    EmptyHistory,
    OutOfRange { index: i64, len: usize },
    InvalidPattern { pattern: String, reason: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHistory => f.write_str("history is empty"),
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} is out of range (history has {len} entries)")
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid search pattern {pattern:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Maps a 1-based (or negative, from-the-end) index to a 0-based offset.
pub fn resolve_index(len: usize, index: i64) -> Result<usize, QueryError> {
    if len == 0 {
        return Err(QueryError::EmptyHistory);
    }
    let out_of_range = || QueryError::OutOfRange { index, len };
    let offset = match index {
        0 => return Err(out_of_range()),
        i if i > 0 => usize::try_from(i - 1).map_err(|_| out_of_range())?,
        i => {
            let back = usize::try_from(i.unsigned_abs()).map_err(|_| out_of_range())?;
            len.checked_sub(back).ok_or_else(out_of_range)?
        }
    };
    if offset >= len {
        return Err(out_of_range());
    }
    Ok(offset)
}

pub fn list(entries: &[HistoryEntry], range: ListRange) -> Result<Vec<Listed<'_>>, QueryError> {
    let (start, end) = match range {
        ListRange::All => (0, entries.len()),
        ListRange::Last(n) => (entries.len().saturating_sub(n), entries.len()),
        ListRange::Span { from, to } => {
            let start = resolve_index(entries.len(), from)?;
            let end = resolve_index(entries.len(), to)?;
            if start > end {
                return Ok(Vec::new());
            }
            (start, end + 1)
        }
    };
    Ok(entries[start..end]
        .iter()
        .enumerate()
        .map(|(offset, entry)| Listed {
            index: start + offset + 1,
            entry,
        })
        .collect())
}

/// The entry at a listing index.
pub fn entry_at(entries: &[HistoryEntry], index: i64) -> Result<&HistoryEntry, QueryError> {
    resolve_index(entries.len(), index).map(|offset| &entries[offset])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{entry_at, list, resolve_index, ListRange, QueryError};
    use crate::model::{EntryKey, HistoryEntry};

    fn history(commands: &[&str]) -> Vec<HistoryEntry> {
        commands
            .iter()
            .enumerate()
            .map(|(n, cmd)| HistoryEntry::new(EntryKey::from_millis(n as u64 + 1), *cmd))
            .collect()
    }

    #[rstest]
    #[case(1, Ok(0))]
    #[case(3, Ok(2))]
    #[case(-1, Ok(2))]
    #[case(-3, Ok(0))]
    #[case(0, Err(QueryError::OutOfRange { index: 0, len: 3 }))]
    #[case(4, Err(QueryError::OutOfRange { index: 4, len: 3 }))]
    #[case(-4, Err(QueryError::OutOfRange { index: -4, len: 3 }))]
    fn resolves_indices(#[case] index: i64, #[case] expected: Result<usize, QueryError>) {
        assert_eq!(resolve_index(3, index), expected);
    }

    #[test]
    fn empty_history_has_no_indices() {
        assert_eq!(resolve_index(0, 1), Err(QueryError::EmptyHistory));
        assert!(list(&[], ListRange::All).unwrap().is_empty());
    }

    #[test]
    fn lists_ranges_with_stable_indices() {
        let entries = history(&["a", "b", "c", "d"]);

        let last: Vec<_> = list(&entries, ListRange::Last(2))
            .unwrap()
            .into_iter()
            .map(|l| (l.index, l.entry.command()))
            .collect();
        assert_eq!(last, vec![(3, "c"), (4, "d")]);

        let span: Vec<_> = list(&entries, ListRange::Span { from: 2, to: -2 })
            .unwrap()
            .into_iter()
            .map(|l| l.entry.command())
            .collect();
        assert_eq!(span, vec!["b", "c"]);

        assert!(list(&entries, ListRange::Span { from: 3, to: 1 }).unwrap().is_empty());
        assert_eq!(list(&entries, ListRange::Last(10)).unwrap().len(), 4);
    }

    #[test]
    fn entry_at_counts_from_either_end() {
        let entries = history(&["a", "b", "c"]);
        assert_eq!(entry_at(&entries, 1).unwrap().command(), "a");
        assert_eq!(entry_at(&entries, -1).unwrap().command(), "c");
        entry_at(&entries, 9).unwrap_err();
    }
}
