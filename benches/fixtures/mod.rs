// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tidemark::model::{EntryKey, HistoryEntry};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("tidemark_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub fn len(self) -> usize {
        match self {
            Self::Small => 100,
            Self::Medium => 1_000,
            Self::Large => 10_000,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

const SHAPES: [&str; 6] = [
    "x{n} = {n} + 1",
    "Enum.map(1..{n}, fn i -> i * {n} end)",
    "%{{id: {n}, name: \"user_{n}\"}}",
    "String.duplicate(\"ab\", {n})",
    "defmodule M{n} do\n  def f, do: {n}\nend",
    "[{n}, {n}] |> Enum.sum()",
];

/// The `i`-th command of a deterministic session transcript.
pub fn command(i: usize) -> String {
    SHAPES[i % SHAPES.len()].replace("{n}", &i.to_string())
}

pub fn commands(case: Case) -> Vec<String> {
    (0..case.len()).map(command).collect()
}

/// Entries with strictly increasing keys, oldest first.
pub fn entries(case: Case) -> Vec<HistoryEntry> {
    commands(case)
        .into_iter()
        .enumerate()
        .map(|(i, command)| {
            HistoryEntry::new(EntryKey::from_millis(1_700_000_000_000 + i as u64), command)
        })
        .collect()
}

pub fn checksum(lines: &[String]) -> u64 {
    lines.iter().fold(0u64, |acc, line| {
        acc.wrapping_mul(131).wrapping_add(line.len() as u64)
    })
}
