// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Open-store bookkeeping for the coordinator.
//!
//! Every session acquires the store for its resolved scope and releases it on teardown. A store
//! file is physically opened by the first acquirer and physically closed by the last releaser,
//! which makes the shared scope safe to attach from any number of sessions. Private and pinned
//! stores are keyed by node, so sessions on the same node share one handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::durable::{DurableStore, StoreError, WriteDurability};
use crate::model::StoreScope;

#[derive(Debug)]
struct OpenStore {
    store: DurableStore,
    refs: usize,
}

/// Physical open/close counters, for status reporting and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub physical_opens: u64,
    pub physical_closes: u64,
}

#[derive(Debug)]
pub struct StoreRegistry {
    root: PathBuf,
    durability: WriteDurability,
    open: HashMap<StoreScope, OpenStore>,
    stats: RegistryStats,
}

impl StoreRegistry {
    pub fn new(root: impl Into<PathBuf>, durability: WriteDurability) -> Self {
        Self {
            root: root.into(),
            durability,
            open: HashMap::new(),
            stats: RegistryStats::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, scope: &StoreScope) -> PathBuf {
        store_path(&self.root, scope)
    }

    /// Attaches one more user to the store for `scope`, opening it if nobody holds it yet.
    pub fn acquire(&mut self, scope: &StoreScope) -> Result<(), StoreError> {
        if let Some(open) = self.open.get_mut(scope) {
            open.refs += 1;
            debug!(?scope, refs = open.refs, "attached to open history store");
            return Ok(());
        }

        let store = DurableStore::open(self.path_for(scope), self.durability)?;
        self.stats.physical_opens += 1;
        info!(?scope, path = ?store.path(), entries = store.size(), "history store opened");
        self.open.insert(scope.clone(), OpenStore { store, refs: 1 });
        Ok(())
    }

    /// Detaches one user. Returns `true` when this was the last user and the file was closed.
    pub fn release(&mut self, scope: &StoreScope) -> Result<bool, StoreError> {
        let Some(open) = self.open.get_mut(scope) else {
            return Ok(false);
        };
        open.refs = open.refs.saturating_sub(1);
        if open.refs > 0 {
            debug!(?scope, refs = open.refs, "detached from history store");
            return Ok(false);
        }

        let Some(open) = self.open.remove(scope) else {
            return Ok(false);
        };
        self.stats.physical_closes += 1;
        info!(?scope, "history store closed");
        open.store.close()?;
        Ok(true)
    }

    pub fn get(&self, scope: &StoreScope) -> Option<&DurableStore> {
        self.open.get(scope).map(|open| &open.store)
    }

    pub fn get_mut(&mut self, scope: &StoreScope) -> Option<&mut DurableStore> {
        self.open.get_mut(scope).map(|open| &mut open.store)
    }

    pub fn refs(&self, scope: &StoreScope) -> usize {
        self.open.get(scope).map_or(0, |open| open.refs)
    }

    pub fn open_scopes(&self) -> Vec<StoreScope> {
        self.open.keys().cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Closes every open store regardless of reference counts.
    pub fn close_all(&mut self) -> Vec<(StoreScope, StoreError)> {
        let mut failures = Vec::new();
        for (scope, open) in self.open.drain() {
            self.stats.physical_closes += 1;
            if let Err(err) = open.store.close() {
                failures.push((scope, err));
            }
        }
        failures
    }
}

/// Deterministic file location for a scope under `root`.
pub fn store_path(root: &Path, scope: &StoreScope) -> PathBuf {
    let file_name = match scope {
        StoreScope::Private { node } => {
            format!("private-{}.jsonl", encode_persisted_id_segment(node.as_str()))
        }
        StoreScope::Pinned { node } => {
            format!("pinned-{}.jsonl", encode_persisted_id_segment(node.as_str()))
        }
        StoreScope::Shared => "shared.jsonl".to_owned(),
    };
    root.join(file_name)
}

/// Hex-escapes id segments that are not portable as file name parts.
///
/// Runtime handles such as `<0.117.0>` or node names such as `app@host` contain characters that
/// are reserved on Windows; those are written as `~` followed by the hex bytes.
fn encode_persisted_id_segment(segment: &str) -> String {
    if !needs_filename_segment_encoding(segment) {
        return segment.to_owned();
    }

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(1 + segment.len().saturating_mul(2));
    out.push('~');
    for &b in segment.as_bytes() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

fn needs_filename_segment_encoding(segment: &str) -> bool {
    if segment.starts_with('~') || segment.starts_with('.') {
        return true;
    }
    if segment.ends_with(' ') || segment.ends_with('.') {
        return true;
    }

    for ch in segment.chars() {
        if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '-') {
            return true;
        }
        if ch <= '\u{1f}' || ch == '\u{7f}' {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{store_path, StoreRegistry};
    use crate::model::{NodeName, StoreScope};
    use crate::store::WriteDurability;

    static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    struct TempDir {
        path: std::path::PathBuf,
    }

    impl TempDir {
        fn new(prefix: &str) -> Self {
            let nanos =
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
            let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
            let mut path = std::env::temp_dir();
            path.push(format!("tidemark-{prefix}-{}-{nanos}-{counter}", std::process::id()));
            std::fs::create_dir_all(&path).unwrap();
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn shared_store_is_opened_and_closed_once() {
        let tmp = TempDir::new("registry-shared");
        let mut registry = StoreRegistry::new(&tmp.path, WriteDurability::BestEffort);

        for _ in 0..3 {
            registry.acquire(&StoreScope::Shared).unwrap();
        }
        assert_eq!(registry.refs(&StoreScope::Shared), 3);

        assert!(!registry.release(&StoreScope::Shared).unwrap());
        assert!(!registry.release(&StoreScope::Shared).unwrap());
        assert!(registry.release(&StoreScope::Shared).unwrap());

        let stats = registry.stats();
        assert_eq!(stats.physical_opens, 1);
        assert_eq!(stats.physical_closes, 1);
        assert!(registry.get(&StoreScope::Shared).is_none());
    }

    #[test]
    fn releasing_unknown_scope_is_a_no_op() {
        let tmp = TempDir::new("registry-unknown");
        let mut registry = StoreRegistry::new(&tmp.path, WriteDurability::BestEffort);
        assert!(!registry.release(&StoreScope::Shared).unwrap());
        assert_eq!(registry.stats().physical_closes, 0);
    }

    #[test]
    fn store_paths_are_deterministic_and_filename_safe() {
        let root = std::path::Path::new("/cache/tidemark");
        let node = NodeName::new("app@host").unwrap();

        let private = store_path(root, &StoreScope::Private { node: node.clone() });
        assert_eq!(private, root.join("private-app@host.jsonl"));

        let odd = NodeName::new("a-b:c").unwrap();
        assert_eq!(
            store_path(root, &StoreScope::Private { node: odd }),
            root.join("private-~612d623a63.jsonl")
        );

        let pinned = store_path(root, &StoreScope::Pinned { node });
        assert_eq!(pinned, root.join("pinned-app@host.jsonl"));
        assert_eq!(store_path(root, &StoreScope::Shared), root.join("shared.jsonl"));
    }
}
