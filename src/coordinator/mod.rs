// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The session event coordinator.
//!
//! A single actor task owns every session's state and every open store. Sessions talk to it
//! through a [`SessionLink`], whose relay task forwards protocol events in order and reports the
//! session down when the link goes away. Query and maintenance requests go through the cloneable
//! [`CoordinatorHandle`].

use std::fmt;
use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

use crate::config::{ConfigError, HistoryConfig};
use crate::model::{
    EditorRequest, EvaluatorRequest, HistoryEntry, NodeName, ProtocolEvent, Scope, SessionId,
};
use crate::query::{ListRange, QueryError};
use crate::store::StoreError;
use crate::validate::CommandValidator;

mod actor;
mod filter;
mod relay;
mod session;

pub use filter::{CallFilter, CallKind};
pub use relay::{EventSender, SessionLink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub node: NodeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub session: SessionId,
    pub node: NodeName,
    pub scope: Scope,
    pub active: bool,
    pub store_path: Option<PathBuf>,
    pub size: usize,
    pub limit: usize,
    pub navigation_depth: usize,
    pub navigation_cap: usize,
    pub accumulating: bool,
    pub persists_bindings: bool,
}

type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

pub(crate) enum Command {
    Register {
        info: SessionInfo,
        editor: mpsc::UnboundedSender<EditorRequest>,
        evaluator: mpsc::UnboundedSender<EvaluatorRequest>,
        reply: Reply<bool>,
    },
    Event {
        session: SessionId,
        event: ProtocolEvent,
    },
    Sync {
        reply: oneshot::Sender<()>,
    },
    SessionDown {
        session: SessionId,
    },
    NodeDown {
        node: NodeName,
        reply: oneshot::Sender<usize>,
    },
    Entries {
        session: SessionId,
        reply: Reply<Vec<HistoryEntry>>,
    },
    Execute {
        session: SessionId,
        index: i64,
        reply: Reply<String>,
    },
    Copy {
        session: SessionId,
        index: i64,
        reply: Reply<String>,
    },
    Edit {
        session: SessionId,
        index: i64,
        reply: Reply<String>,
    },
    Clear {
        session: SessionId,
        reply: Reply<usize>,
    },
    ClearRange {
        session: SessionId,
        range: ListRange,
        reply: Reply<usize>,
    },
    KeepLast {
        session: SessionId,
        n: usize,
        reply: Reply<usize>,
    },
    Status {
        session: SessionId,
        reply: Reply<SessionStatus>,
    },
    EvictNow {
        reply: oneshot::Sender<usize>,
    },
    RegisterPrefix {
        prefix: String,
        reply: Reply<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
pub enum CoordinatorError {
    /// The coordinator task has stopped.
    Stopped,
    UnknownSession { session: SessionId },
    AlreadyRegistered { session: SessionId },
    /// The session is registered but has no usable store.
    HistoryInactive { session: SessionId },
    InvalidPrefix { prefix: String },
    Config(ConfigError),
    Query(QueryError),
    Store(StoreError),
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("history coordinator is not running"),
            Self::UnknownSession { session } => write!(f, "unknown session {session}"),
            Self::AlreadyRegistered { session } => {
                write!(f, "session {session} is already registered")
            }
            Self::HistoryInactive { session } => {
                write!(f, "history is not active for session {session}")
            }
            Self::InvalidPrefix { prefix } => {
                write!(f, "{prefix:?} is not a valid function name")
            }
            Self::Config(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for CoordinatorError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<QueryError> for CoordinatorError {
    fn from(err: QueryError) -> Self {
        Self::Query(err)
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Validates `config` and starts the coordinator on the current tokio runtime.
    pub fn spawn(
        config: HistoryConfig,
        validator: impl CommandValidator,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let (commands, rx) = mpsc::unbounded_channel();
        let actor = actor::Actor::new(config, Box::new(validator));
        tokio::spawn(actor.run(rx));
        Ok(Self { commands })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| CoordinatorError::Stopped)?;
        response.await.map_err(|_| CoordinatorError::Stopped)
    }

    /// Registers a session and starts its relay.
    ///
    /// A session whose store cannot be opened, or that is inert under a pinned scope, is still
    /// registered; its link reports `is_active() == false` and nothing is recorded.
    pub async fn register(
        &self,
        info: SessionInfo,
        editor: mpsc::UnboundedSender<EditorRequest>,
        evaluator: mpsc::UnboundedSender<EvaluatorRequest>,
    ) -> Result<SessionLink, CoordinatorError> {
        let session = info.id.clone();
        let active = self
            .request(|reply| Command::Register {
                info,
                editor,
                evaluator,
                reply,
            })
            .await??;
        Ok(relay::spawn(session, self.commands.clone(), active))
    }

    /// Tears down every session on `node`. Returns how many were removed.
    pub async fn node_down(&self, node: &NodeName) -> Result<usize, CoordinatorError> {
        let node = node.clone();
        self.request(|reply| Command::NodeDown { node, reply }).await
    }

    /// Listing-visible entries for a session, oldest first.
    pub async fn entries(&self, session: &SessionId) -> Result<Vec<HistoryEntry>, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Entries { session, reply })
            .await?
    }

    /// Evaluates the entry at `index` in the session and records it. Returns the evaluated text.
    pub async fn execute(&self, session: &SessionId, index: i64) -> Result<String, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Execute {
            session,
            index,
            reply,
        })
        .await?
    }

    /// Pastes the entry at `index` into the session's line editor.
    pub async fn copy(&self, session: &SessionId, index: i64) -> Result<String, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Copy {
            session,
            index,
            reply,
        })
        .await?
    }

    /// Opens the external editor on the entry at `index`.
    pub async fn edit(&self, session: &SessionId, index: i64) -> Result<String, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Edit {
            session,
            index,
            reply,
        })
        .await?
    }

    pub async fn clear(&self, session: &SessionId) -> Result<usize, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Clear { session, reply })
            .await?
    }

    pub async fn clear_range(
        &self,
        session: &SessionId,
        range: ListRange,
    ) -> Result<usize, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::ClearRange {
            session,
            range,
            reply,
        })
        .await?
    }

    /// Deletes everything but the `n` most recent entries.
    pub async fn keep_last(&self, session: &SessionId, n: usize) -> Result<usize, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::KeepLast { session, n, reply })
            .await?
    }

    pub async fn status(&self, session: &SessionId) -> Result<SessionStatus, CoordinatorError> {
        let session = session.clone();
        self.request(|reply| Command::Status { session, reply })
            .await?
    }

    /// Runs an eviction pass over every open store now. Returns entries removed.
    pub async fn evict_now(&self) -> Result<usize, CoordinatorError> {
        self.request(|reply| Command::EvictNow { reply }).await
    }

    /// Adds a function name to the internal-call set. Returns `false` if it was already known.
    pub async fn register_internal_prefix(&self, prefix: &str) -> Result<bool, CoordinatorError> {
        let prefix = prefix.to_owned();
        self.request(|reply| Command::RegisterPrefix { prefix, reply })
            .await?
    }

    /// Closes every store and stops the coordinator.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
