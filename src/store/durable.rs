// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{EntryKey, HistoryEntry};

/// Compaction is skipped for logs smaller than this many records.
const COMPACTION_MIN_RECORDS: usize = 64;

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Appends go straight to the OS page cache.
    /// - Compaction writes a temp file and renames atomically into place without fsync.
    #[default]
    BestEffort,

    /// Every append is synced to stable storage before the call returns.
    ///
    /// Compaction additionally syncs the renamed file's directory where supported. Exact
    /// guarantees are platform/filesystem-dependent.
    Durable,
}

/// One line of the append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogRecord {
    Put { key: EntryKey, value: String },
    Del { key: EntryKey },
    /// Deletes every key up to and including `through`.
    Evict { through: EntryKey },
    Clear,
}

/// Keyed, append-only persistence for one history scope.
///
/// The file is a JSON-lines log replayed into a sorted in-memory index on open. The index keeps
/// keys ordered, so eviction of the oldest entries never scans the log.
#[derive(Debug)]
pub struct DurableStore {
    path: PathBuf,
    durability: WriteDurability,
    file: fs::File,
    entries: BTreeMap<EntryKey, String>,
    log_records: usize,
    high_water: Option<EntryKey>,
}

impl DurableStore {
    pub fn open(path: impl Into<PathBuf>, durability: WriteDurability) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        refuse_symlink(&path)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let (entries, log_records, high_water) = replay_log(&path, &bytes);

        let mut file = open_append(&path)?;
        // A torn final line must not swallow the next record.
        if bytes.last().is_some_and(|b| *b != b'\n') {
            file.write_all(b"\n").map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        }
        let mut store = Self {
            path,
            durability,
            file,
            entries,
            log_records,
            high_water,
        };
        store.compact_if_needed()?;
        debug!(path = ?store.path, entries = store.entries.len(), "opened history store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: EntryKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn put(&mut self, key: EntryKey, value: &str) -> Result<(), StoreError> {
        self.append_record(&LogRecord::Put {
            key,
            value: value.to_owned(),
        })?;
        self.entries.insert(key, value.to_owned());
        self.high_water = self.high_water.max(Some(key));
        Ok(())
    }

    /// Stores `command` under a fresh key strictly greater than every key this store has seen.
    pub fn append(&mut self, command: &str) -> Result<EntryKey, StoreError> {
        let now = EntryKey::now();
        let key = match self.high_water {
            Some(last) if last >= now => last.successor(),
            _ => now,
        };
        self.put(key, command)?;
        Ok(key)
    }

    pub fn delete(&mut self, key: EntryKey) -> Result<bool, StoreError> {
        if !self.entries.contains_key(&key) {
            return Ok(false);
        }
        self.append_record(&LogRecord::Del { key })?;
        self.entries.remove(&key);
        Ok(true)
    }

    pub fn delete_all(&mut self) -> Result<usize, StoreError> {
        let removed = self.entries.len();
        self.append_record(&LogRecord::Clear)?;
        self.entries.clear();
        self.compact_if_needed()?;
        Ok(removed)
    }

    /// Removes the `count` oldest entries in a single log record.
    pub fn evict_oldest(&mut self, count: usize) -> Result<usize, StoreError> {
        let Some(through) = self.entries.keys().take(count).last().copied() else {
            return Ok(0);
        };
        self.append_record(&LogRecord::Evict { through })?;
        let kept = self.entries.split_off(&through.successor());
        let removed = self.entries.len();
        self.entries = kept;
        self.compact_if_needed()?;
        Ok(removed)
    }

    /// Folds over entries oldest first.
    pub fn fold<A>(&self, init: A, mut f: impl FnMut(A, EntryKey, &str) -> A) -> A {
        self.entries
            .iter()
            .fold(init, |acc, (key, value)| f(acc, *key, value))
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.fold(Vec::with_capacity(self.size()), |mut acc, key, value| {
            acc.push(HistoryEntry::new(key, value));
            acc
        })
    }

    /// Up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .take(limit)
            .map(|(key, value)| HistoryEntry::new(*key, value.as_str()))
            .collect()
    }

    pub fn close(mut self) -> Result<(), StoreError> {
        self.compact_if_needed()?;
        self.file.sync_all().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = ?self.path, "closed history store");
        Ok(())
    }

    fn append_record(&mut self, record: &LogRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        line.push(b'\n');

        self.file.write_all(&line).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if self.durability == WriteDurability::Durable {
            self.file.sync_data().map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        self.log_records += 1;
        Ok(())
    }

    fn compact_if_needed(&mut self) -> Result<(), StoreError> {
        let live = self.entries.len();
        if self.log_records < COMPACTION_MIN_RECORDS || self.log_records <= live.saturating_mul(2) {
            return Ok(());
        }

        let mut contents = Vec::new();
        for (key, value) in &self.entries {
            let record = LogRecord::Put {
                key: *key,
                value: value.clone(),
            };
            serde_json::to_writer(&mut contents, &record).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
            contents.push(b'\n');
        }

        write_atomic(&self.path, &contents, self.durability)?;
        self.file = open_append(&self.path)?;
        debug!(
            path = ?self.path,
            before = self.log_records,
            after = live,
            "compacted history log"
        );
        self.log_records = live;
        Ok(())
    }
}

fn replay_log(
    path: &Path,
    bytes: &[u8],
) -> (BTreeMap<EntryKey, String>, usize, Option<EntryKey>) {
    let mut entries = BTreeMap::new();
    let mut records = 0usize;
    let mut high_water = None;
    let mut skipped = 0usize;

    let mut start = 0usize;
    let ends = memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len()));
    for end in ends {
        let line = &bytes[start..end];
        start = end + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record = match serde_json::from_slice::<LogRecord>(line) {
            Ok(record) => record,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        records += 1;
        match record {
            LogRecord::Put { key, value } => {
                high_water = high_water.max(Some(key));
                entries.insert(key, value);
            }
            LogRecord::Del { key } => {
                entries.remove(&key);
            }
            LogRecord::Evict { through } => {
                entries = entries.split_off(&through.successor());
            }
            LogRecord::Clear => entries.clear(),
        }
    }

    if skipped > 0 {
        warn!(?path, skipped, "ignored unreadable history records");
    }

    (entries, records, high_water)
}

fn open_append(path: &Path) -> Result<fs::File, StoreError> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

include!("durable/helpers.rs");
