// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{HistoryConfig, OwnCallPolicy};
use crate::model::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Plain,
    /// A call to one of the history system's own query/admin functions.
    Internal,
    /// A call to the execute-by-index function, optionally bound as `var = hx(3)`.
    ExecByIndex { binding: Option<String> },
}

fn binding_prefix() -> &'static Regex {
    static BINDING: OnceLock<Regex> = OnceLock::new();
    BINDING.get_or_init(|| {
        Regex::new(r"(?s)^\s*(?:([a-z_][A-Za-z0-9_]*)\s*=\s*)?(.*)$")
            .expect("hard-coded binding regex is valid")
    })
}

/// Recognizes the history system's own calls by function name.
#[derive(Debug, Clone)]
pub struct CallFilter {
    internal: Vec<String>,
    exec_function: String,
}

impl CallFilter {
    pub fn new(internal: impl IntoIterator<Item = impl Into<String>>, exec_function: &str) -> Self {
        Self {
            internal: internal.into_iter().map(Into::into).collect(),
            exec_function: exec_function.to_owned(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.internal_prefixes.iter().cloned(), &config.exec_function)
    }

    /// Returns `false` if `prefix` was already known.
    pub fn register(&mut self, prefix: &str) -> bool {
        if self.internal.iter().any(|known| known == prefix) {
            return false;
        }
        self.internal.push(prefix.to_owned());
        true
    }

    pub fn classify(&self, command: &str) -> CallKind {
        let (binding, call) = match binding_prefix().captures(command) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str()),
                caps.get(2).map_or("", |m| m.as_str()),
            ),
            None => (None, command.trim_start()),
        };

        if calls(call, &self.exec_function) {
            return CallKind::ExecByIndex {
                binding: binding.map(ToOwned::to_owned),
            };
        }
        if self.internal.iter().any(|name| calls(call, name)) {
            return CallKind::Internal;
        }
        CallKind::Plain
    }

    /// Entries shown by listings and searches under `policy`.
    pub fn visible(&self, mut entries: Vec<HistoryEntry>, policy: OwnCallPolicy) -> Vec<HistoryEntry> {
        if policy != OwnCallPolicy::Record {
            entries.retain(|entry| self.classify(entry.command()) == CallKind::Plain);
        }
        entries
    }
}

fn calls(text: &str, name: &str) -> bool {
    text.strip_prefix(name).is_some_and(|tail| {
        !tail.starts_with(|c: char| c.is_alphanumeric() || matches!(c, '_' | '?' | '!' | '.'))
    })
}
