// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Millisecond timestamp used both as the unique key and the sort key of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKey(u64);

impl EntryKey {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The smallest key strictly greater than `self`.
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = itoa::Buffer::new();
        f.write_str(buf.format(self.0))
    }
}

/// One persisted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    key: EntryKey,
    command: String,
}

impl HistoryEntry {
    pub fn new(key: EntryKey, command: impl Into<String>) -> Self {
        Self {
            key,
            command: command.into(),
        }
    }

    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn into_command(self) -> String {
        self.command
    }
}
