// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! History configuration.
//!
//! Loaded from a JSON file by the host; every field has a default so an empty object is a valid
//! configuration.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{NavKey, Scope};
use crate::store::WriteDurability;

/// Upper bound applied when the history limit is unbounded.
pub const HISTORY_SAFETY_CEILING: usize = 100_000;

const DEFAULT_HISTORY_LIMIT: usize = 2_000;
const DEFAULT_NAVIGATION_BUFFER: usize = 75;
const DEFAULT_EVICTION_FACTOR: f64 = 0.1;
const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 60;
const STORE_DIR_NAME: &str = "tidemark";

/// What happens to the history system's own query/admin calls typed into the shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OwnCallPolicy {
    /// Stored and listed like any other command.
    Record,
    /// Stored (and navigable) but left out of listings and searches.
    #[default]
    Hide,
    /// Never stored.
    Discard,
}

/// Control codes for the navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct KeyBindings {
    pub scroll_older: u8,
    pub scroll_newer: u8,
    pub enter: u8,
    pub open_editor: u8,
    pub modify: u8,
    pub abandon: u8,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            scroll_older: 0x15, // ^U
            scroll_newer: 0x0b, // ^K
            enter: 0x06,        // ^F
            open_editor: 0x0f,  // ^O
            modify: 0x18,       // ^X
            abandon: 0x07,      // ^G
        }
    }
}

impl KeyBindings {
    fn pairs(&self) -> [(u8, NavKey); 6] {
        [
            (self.scroll_older, NavKey::ScrollOlder),
            (self.scroll_newer, NavKey::ScrollNewer),
            (self.enter, NavKey::Enter),
            (self.open_editor, NavKey::OpenEditor),
            (self.modify, NavKey::Modify),
            (self.abandon, NavKey::Abandon),
        ]
    }

    pub fn resolve(&self, code: u8) -> Option<NavKey> {
        self.pairs()
            .into_iter()
            .find_map(|(bound, key)| (bound == code).then_some(key))
    }

    fn first_conflict(&self) -> Option<u8> {
        let pairs = self.pairs();
        pairs.iter().enumerate().find_map(|(idx, (code, _))| {
            pairs[idx + 1..]
                .iter()
                .any(|(other, _)| other == code)
                .then_some(*code)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub scope: Scope,
    /// Maximum stored entries per scope; `null` means unbounded (capped internally).
    pub history_limit: Option<usize>,
    /// Share of the limit removed, oldest first, once the limit is reached.
    pub eviction_factor: f64,
    pub eviction_interval_secs: u64,
    pub own_calls: OwnCallPolicy,
    pub save_invalid_results: bool,
    pub prepend_identifiers: bool,
    pub navigation_buffer_size: usize,
    pub keep_duplicates: bool,
    pub key_bindings: KeyBindings,
    pub durability: WriteDurability,
    pub store_dir: Option<PathBuf>,
    /// Function names treated as the history system's own query/admin calls.
    pub internal_prefixes: Vec<String>,
    /// The execute-by-index function; never stored.
    pub exec_function: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            scope: Scope::default(),
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            eviction_factor: DEFAULT_EVICTION_FACTOR,
            eviction_interval_secs: DEFAULT_EVICTION_INTERVAL_SECS,
            own_calls: OwnCallPolicy::default(),
            save_invalid_results: false,
            prepend_identifiers: true,
            navigation_buffer_size: DEFAULT_NAVIGATION_BUFFER,
            keep_duplicates: false,
            key_bindings: KeyBindings::default(),
            durability: WriteDurability::Durable,
            store_dir: None,
            internal_prefixes: ["hl", "hs", "hsi", "hsa", "hc", "he", "hclear", "hstatus"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            exec_function: "hx".to_owned(),
        }
    }
}

impl HistoryConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.navigation_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "navigation_buffer_size",
                reason: "must be at least 1".to_owned(),
            });
        }
        if !(self.eviction_factor > 0.0 && self.eviction_factor <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "eviction_factor",
                reason: format!("must be in (0, 1], got {}", self.eviction_factor),
            });
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "history_limit",
                reason: "must be at least 1 (use null for unbounded)".to_owned(),
            });
        }
        if self.eviction_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "eviction_interval_secs",
                reason: "must be at least 1".to_owned(),
            });
        }
        if let Some(code) = self.key_bindings.first_conflict() {
            return Err(ConfigError::Invalid {
                field: "key_bindings",
                reason: format!("control code {code:#04x} is bound twice"),
            });
        }
        if !is_identifier(&self.exec_function) {
            return Err(ConfigError::Invalid {
                field: "exec_function",
                reason: format!("{:?} is not a function name", self.exec_function),
            });
        }
        if let Some(prefix) = self.internal_prefixes.iter().find(|p| !is_identifier(p)) {
            return Err(ConfigError::Invalid {
                field: "internal_prefixes",
                reason: format!("{prefix:?} is not a function name"),
            });
        }
        Ok(())
    }

    /// The limit actually enforced, with unbounded mapped to the safety ceiling.
    pub fn effective_limit(&self) -> usize {
        self.history_limit
            .unwrap_or(HISTORY_SAFETY_CEILING)
            .min(HISTORY_SAFETY_CEILING)
    }

    /// Entries removed by one eviction pass: `ceil(limit × factor)`, at least one.
    pub fn eviction_batch(&self) -> usize {
        let limit = self.effective_limit();
        let batch = (limit as f64 * self.eviction_factor).ceil() as usize;
        batch.clamp(1, limit)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }
}

pub fn default_store_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(STORE_DIR_NAME)
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '?' | '!'))
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read config {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "invalid config json in {path:?}: {source}"),
            Self::Invalid { field, reason } => write!(f, "invalid config field {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Invalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ConfigError, HistoryConfig, KeyBindings, OwnCallPolicy, HISTORY_SAFETY_CEILING};
    use crate::model::{NavKey, Scope};

    #[test]
    fn empty_object_yields_defaults() {
        let config: HistoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HistoryConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn parses_pinned_scope_and_policy() {
        let config: HistoryConfig = serde_json::from_str(
            r#"{"scope":{"pinned":{"node":"app@host"}},"own_calls":"discard","history_limit":null}"#,
        )
        .unwrap();
        assert_eq!(
            config.scope,
            Scope::Pinned {
                node: "app@host".to_owned()
            }
        );
        assert_eq!(config.own_calls, OwnCallPolicy::Discard);
        assert_eq!(config.effective_limit(), HISTORY_SAFETY_CEILING);
    }

    #[test]
    fn rejects_unknown_fields() {
        serde_json::from_str::<HistoryConfig>(r#"{"scrollback":3}"#).unwrap_err();
    }

    #[rstest]
    #[case(10, 0.1, 1)]
    #[case(15, 0.1, 2)]
    #[case(100, 0.25, 25)]
    #[case(3, 0.01, 1)]
    #[case(4, 1.0, 4)]
    fn eviction_batch_rounds_up(#[case] limit: usize, #[case] factor: f64, #[case] batch: usize) {
        let config = HistoryConfig {
            history_limit: Some(limit),
            eviction_factor: factor,
            ..HistoryConfig::default()
        };
        assert_eq!(config.eviction_batch(), batch);
    }

    #[test]
    fn rejects_duplicate_key_bindings() {
        let config = HistoryConfig {
            key_bindings: KeyBindings {
                abandon: 0x15,
                ..KeyBindings::default()
            },
            ..HistoryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "key_bindings",
                ..
            })
        ));
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.5)]
    #[case(f64::NAN)]
    fn rejects_out_of_range_eviction_factor(#[case] factor: f64) {
        let config = HistoryConfig {
            eviction_factor: factor,
            ..HistoryConfig::default()
        };
        config.validate().unwrap_err();
    }

    #[test]
    fn resolves_default_bindings() {
        let keys = KeyBindings::default();
        assert_eq!(keys.resolve(0x15), Some(NavKey::ScrollOlder));
        assert_eq!(keys.resolve(0x0b), Some(NavKey::ScrollNewer));
        assert_eq!(keys.resolve(b'a'), None);
    }
}
