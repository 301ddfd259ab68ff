// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ids::NodeName;

/// How history storage is partitioned across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One store per node, surviving shell restarts on that node.
    #[default]
    Private,
    /// One store for a single named node; sessions on other nodes are inert.
    Pinned { node: String },
    /// One store for every session in the cluster.
    Shared,
}

/// Which physical store a registered session writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreScope {
    Private { node: NodeName },
    Pinned { node: NodeName },
    Shared,
}

impl Scope {
    /// Resolves the store a session on `node` should use, or `None` if the session is inert
    /// under this scope.
    ///
    /// Session ids are runtime handles that change with every restart, so no scope is keyed on
    /// them.
    pub fn store_scope(&self, node: &NodeName) -> Option<StoreScope> {
        match self {
            Self::Private => Some(StoreScope::Private { node: node.clone() }),
            Self::Pinned { node: pinned } => {
                (pinned == node.as_str()).then(|| StoreScope::Pinned { node: node.clone() })
            }
            Self::Shared => Some(StoreScope::Shared),
        }
    }

    /// Shared history disables variable-binding persistence in the host shell.
    pub fn persists_bindings(&self) -> bool {
        !matches!(self, Self::Shared)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Pinned { node } => write!(f, "pinned:{node}"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScopeError {
    value: String,
}

impl fmt::Display for ParseScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid scope {:?} (expected private, shared or pinned:<node>)",
            self.value
        )
    }
}

impl std::error::Error for ParseScopeError {}

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            other => match other.strip_prefix("pinned:") {
                Some(node) if !node.trim().is_empty() => Ok(Self::Pinned {
                    node: node.trim().to_owned(),
                }),
                _ => Err(ParseScopeError {
                    value: s.to_owned(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Scope, StoreScope};
    use crate::model::NodeName;

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("private".parse::<Scope>().unwrap(), Scope::Private);
        assert_eq!("shared".parse::<Scope>().unwrap(), Scope::Shared);
        assert_eq!(
            "pinned:app@host".parse::<Scope>().unwrap(),
            Scope::Pinned {
                node: "app@host".to_owned()
            }
        );
        "pinned:".parse::<Scope>().unwrap_err();
        "global".parse::<Scope>().unwrap_err();
    }

    #[test]
    fn pinned_scope_is_inert_on_other_nodes() {
        let scope = Scope::Pinned {
            node: "a@host".to_owned(),
        };
        let here = NodeName::new("a@host").unwrap();
        let elsewhere = NodeName::new("b@host").unwrap();

        assert_eq!(
            scope.store_scope(&here),
            Some(StoreScope::Pinned { node: here.clone() })
        );
        assert_eq!(scope.store_scope(&elsewhere), None);
    }

    #[test]
    fn private_scope_is_keyed_by_node() {
        let node = NodeName::new("app@host").unwrap();
        assert_eq!(
            Scope::Private.store_scope(&node),
            Some(StoreScope::Private { node: node.clone() })
        );
        assert_eq!(Scope::Shared.store_scope(&node), Some(StoreScope::Shared));
    }

    #[test]
    fn only_shared_scope_disables_binding_persistence() {
        assert!(Scope::Private.persists_bindings());
        assert!(!Scope::Shared.persists_bindings());
    }
}
