// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{DateTime, Utc};
use crossterm::style::Stylize;

use super::Listed;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Prefix each line with the entry's UTC timestamp.
    pub dates: bool,
    /// Emit ANSI styling for the index and timestamp columns.
    pub color: bool,
}

/// One printable line per listed entry, index column right-aligned.
///
/// Multi-line commands keep their line breaks; continuation lines are indented under the
/// command column.
pub fn render_lines(listing: &[Listed<'_>], options: RenderOptions) -> Vec<String> {
    let width = listing
        .iter()
        .map(|listed| itoa::Buffer::new().format(listed.index).len())
        .max()
        .unwrap_or(1);

    listing
        .iter()
        .map(|listed| {
            let mut index_buf = itoa::Buffer::new();
            let index = format!("{:>width$}", index_buf.format(listed.index));
            let mut prefix = if options.color {
                format!("{}  ", index.as_str().dark_grey())
            } else {
                format!("{index}  ")
            };
            let mut indent = width + 2;

            if options.dates {
                let stamp = format_timestamp(listed.entry.key().as_millis());
                indent += stamp.len() + 2;
                if options.color {
                    prefix.push_str(&format!("{}  ", stamp.as_str().dark_cyan()));
                } else {
                    prefix.push_str(&stamp);
                    prefix.push_str("  ");
                }
            }

            let pad = " ".repeat(indent);
            let mut line = prefix;
            for (n, part) in listed.entry.command().split('\n').enumerate() {
                if n > 0 {
                    line.push('\n');
                    line.push_str(&pad);
                }
                line.push_str(part);
            }
            line
        })
        .collect()
}

fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??:??".to_owned())
}

#[cfg(test)]
mod tests {
    use super::{render_lines, RenderOptions};
    use crate::model::{EntryKey, HistoryEntry};
    use crate::query::{list, ListRange};

    #[test]
    fn pads_indices_and_indents_continuations() {
        let entries: Vec<_> = (1..=10u64)
            .map(|n| HistoryEntry::new(EntryKey::from_millis(n), format!("c{n}")))
            .chain(std::iter::once(HistoryEntry::new(
                EntryKey::from_millis(11),
                "if x do\n  1\nend",
            )))
            .collect();
        let listing = list(&entries, ListRange::Last(3)).unwrap();

        let lines = render_lines(&listing, RenderOptions::default());
        assert_eq!(lines, vec![" 9  c9", "10  c10", "11  if x do\n      1\n    end"]);
    }

    #[test]
    fn dates_use_utc_timestamps() {
        let entries = vec![HistoryEntry::new(
            EntryKey::from_millis(1_700_000_000_000),
            "x = 1",
        )];
        let listing = list(&entries, ListRange::All).unwrap();

        let lines = render_lines(
            &listing,
            RenderOptions {
                dates: true,
                color: false,
            },
        );
        assert_eq!(lines, vec!["1  2023-11-14 22:13:20  x = 1"]);
    }

    #[test]
    fn color_wraps_columns_in_ansi_sequences() {
        let entries = vec![HistoryEntry::new(EntryKey::from_millis(1), "x")];
        let listing = list(&entries, ListRange::All).unwrap();

        let lines = render_lines(
            &listing,
            RenderOptions {
                dates: false,
                color: true,
            },
        );
        assert!(lines[0].contains("\u{1b}["));
        assert!(lines[0].ends_with("x"));
    }
}
