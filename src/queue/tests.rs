// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};

use super::{Direction, NavQueue};
use crate::model::{EntryKey, HistoryEntry};

/// Queue holding c1..c5 with c5 most recent.
#[fixture]
fn five() -> NavQueue {
    let mut queue = NavQueue::new(75, false);
    for n in 1..=5 {
        queue.insert(&format!("c{n}"));
    }
    queue
}

#[test]
fn consecutive_duplicates_collapse() {
    let mut queue = NavQueue::new(10, false);
    assert!(queue.insert("x = 1"));
    assert!(!queue.insert("x = 1"));
    assert_eq!(queue.len(), 1);

    queue.insert("y");
    queue.insert("x = 1");
    assert_eq!(queue.len(), 3);
}

#[test]
fn duplicates_kept_when_configured() {
    let mut queue = NavQueue::new(10, true);
    queue.insert("x = 1");
    queue.insert("x = 1");
    assert_eq!(queue.len(), 2);
}

#[test]
fn oldest_entries_drop_past_cap() {
    let mut queue = NavQueue::new(3, false);
    for n in 1..=5 {
        queue.insert(&format!("c{n}"));
    }
    assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["c5", "c4", "c3"]);
}

#[rstest]
fn reversal_lands_on_single_step_entry(mut five: NavQueue) {
    let single = five.clone().advance(Direction::Older).map(ToOwned::to_owned);

    for _ in 0..3 {
        five.advance(Direction::Older);
    }
    five.advance(Direction::Newer);
    let shown = five.advance(Direction::Newer).map(ToOwned::to_owned);

    assert_eq!(five.cursor(), 0);
    assert_eq!(five.last_direction(), Some(Direction::Newer));
    assert_eq!(shown, single);
    assert_eq!(shown.as_deref(), Some("c5"));
}

#[rstest]
fn scroll_walks_older_then_back(mut five: NavQueue) {
    assert_eq!(five.advance(Direction::Older), Some("c5"));
    assert_eq!(five.advance(Direction::Older), Some("c4"));
    assert_eq!(five.advance(Direction::Older), Some("c3"));
    assert_eq!(five.advance(Direction::Newer), Some("c4"));
    assert_eq!(five.advance(Direction::Older), Some("c3"));
}

#[rstest]
fn older_clamps_at_oldest(mut five: NavQueue) {
    for _ in 0..10 {
        five.advance(Direction::Older);
    }
    assert_eq!(five.cursor(), 5);
    assert_eq!(five.displayed(), Some("c1"));
}

#[rstest]
fn newer_past_most_recent_stops_navigating(mut five: NavQueue) {
    five.advance(Direction::Older);
    assert_eq!(five.advance(Direction::Newer), None);
    assert!(!five.is_navigating());

    assert_eq!(five.advance(Direction::Newer), None);
    assert_eq!(five.cursor(), 0);
}

#[test]
fn empty_queue_never_navigates() {
    let mut queue = NavQueue::new(5, false);
    assert_eq!(queue.advance(Direction::Older), None);
    assert!(!queue.is_navigating());
}

#[rstest]
fn replace_at_cursor_overwrites_displayed_entry(mut five: NavQueue) {
    assert!(!five.replace_at_cursor("nothing shown"));

    five.advance(Direction::Older);
    five.advance(Direction::Older);
    assert!(five.replace_at_cursor("c4 edited"));
    assert_eq!(five.displayed(), Some("c4 edited"));
    assert_eq!(five.at(2), Some("c4 edited"));
}

#[rstest]
fn remove_latest_drops_buried_entry(mut five: NavQueue) {
    five.advance(Direction::Older);
    assert!(five.remove_latest("c3"));
    assert_eq!(five.iter().collect::<Vec<_>>(), vec!["c5", "c4", "c2", "c1"]);
    assert!(!five.is_navigating());
    assert!(!five.remove_latest("c3"));
}

#[test]
fn remove_latest_keeps_older_duplicates() {
    let mut queue = NavQueue::new(5, true);
    for command in ["x", "y", "x"] {
        queue.insert(command);
    }
    assert!(queue.remove_latest("x"));
    assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["y", "x"]);
}

#[test]
fn seeding_keeps_most_recent_first() {
    let recent: Vec<_> = (1..=4u64)
        .rev()
        .map(|n| HistoryEntry::new(EntryKey::from_millis(n), format!("c{n}")))
        .collect();

    let queue = NavQueue::seeded(3, false, &recent);
    assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["c4", "c3", "c2"]);
}
