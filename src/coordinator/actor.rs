// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::filter::CallFilter;
use super::session::{Ctx, InputMode, SessionState};
use super::{Command, CoordinatorError, SessionInfo, SessionStatus};
use crate::config::{is_identifier, HistoryConfig};
use crate::model::{EditorRequest, EvaluatorRequest, HistoryEntry, NodeName, SessionId};
use crate::query::{self, ListRange};
use crate::queue::NavQueue;
use crate::store::{DurableStore, StoreError, StoreRegistry};
use crate::validate::CommandValidator;

pub(super) struct Actor {
    config: HistoryConfig,
    validator: Box<dyn CommandValidator>,
    filter: CallFilter,
    registry: StoreRegistry,
    sessions: HashMap<SessionId, SessionState>,
}

impl Actor {
    pub(super) fn new(config: HistoryConfig, validator: Box<dyn CommandValidator>) -> Self {
        let registry = StoreRegistry::new(config.resolved_store_dir(), config.durability);
        Self {
            filter: CallFilter::from_config(&config),
            config,
            validator,
            registry,
            sessions: HashMap::new(),
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut ticker = tokio::time::interval(self.config.eviction_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(root = ?self.registry.root(), scope = %self.config.scope, "history coordinator started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = self.evict_all();
                    if removed > 0 {
                        info!(removed, "periodic history eviction");
                    }
                }
            }
        }

        self.close_all();
        info!("history coordinator stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Register {
                info,
                editor,
                evaluator,
                reply,
            } => {
                let _ = reply.send(self.register(info, editor, evaluator));
            }
            Command::Event { session, event } => {
                let handled = self.with_session(&session, |state, ctx| state.on_event(event, ctx));
                if handled.is_err() {
                    debug!(%session, "event for unknown session ignored");
                }
            }
            Command::Sync { reply } => {
                let _ = reply.send(());
            }
            Command::SessionDown { session } => self.teardown(&session),
            Command::NodeDown { node, reply } => {
                let _ = reply.send(self.node_down(&node));
            }
            Command::Entries { session, reply } => {
                let _ = reply.send(self.visible_entries(&session));
            }
            Command::Execute {
                session,
                index,
                reply,
            } => {
                let _ = reply.send(self.execute(&session, index));
            }
            Command::Copy {
                session,
                index,
                reply,
            } => {
                let _ = reply.send(self.send_entry(&session, index, EditorRequest::Insert));
            }
            Command::Edit {
                session,
                index,
                reply,
            } => {
                let _ = reply.send(self.send_entry(&session, index, EditorRequest::OpenEditor));
            }
            Command::Clear { session, reply } => {
                let _ = reply.send(self.clear(&session));
            }
            Command::ClearRange {
                session,
                range,
                reply,
            } => {
                let _ = reply.send(self.clear_range(&session, range));
            }
            Command::KeepLast { session, n, reply } => {
                let _ = reply.send(self.keep_last(&session, n));
            }
            Command::Status { session, reply } => {
                let _ = reply.send(self.status(&session));
            }
            Command::EvictNow { reply } => {
                let _ = reply.send(self.evict_all());
            }
            Command::RegisterPrefix { prefix, reply } => {
                let _ = reply.send(self.register_prefix(&prefix));
            }
            Command::Shutdown { reply } => {
                self.close_all();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn register(
        &mut self,
        info: SessionInfo,
        editor: mpsc::UnboundedSender<EditorRequest>,
        evaluator: mpsc::UnboundedSender<EvaluatorRequest>,
    ) -> Result<bool, CoordinatorError> {
        if self.sessions.contains_key(&info.id) {
            debug!(session = %info.id, "duplicate registration ignored");
            return Err(CoordinatorError::AlreadyRegistered { session: info.id });
        }

        let store = match self.config.scope.store_scope(&info.node) {
            None => {
                info!(session = %info.id, node = %info.node, scope = %self.config.scope, "history inert on this node");
                None
            }
            Some(scope) => match self.registry.acquire(&scope) {
                Ok(()) => Some(scope),
                Err(err) => {
                    warn!(session = %info.id, %err, "history disabled for session");
                    None
                }
            },
        };

        let cap = self.config.navigation_buffer_size;
        let recent = store
            .as_ref()
            .and_then(|scope| self.registry.get(scope))
            .map(|store| store.recent(cap))
            .unwrap_or_default();
        let queue = NavQueue::seeded(cap, self.config.keep_duplicates, &recent);

        let active = store.is_some();
        info!(session = %info.id, node = %info.node, active, seeded = queue.len(), "session registered");
        let state = SessionState::new(info.id.clone(), info.node, store, queue, editor, evaluator);
        self.sessions.insert(info.id, state);
        Ok(active)
    }

    fn teardown(&mut self, session: &SessionId) {
        let Some(state) = self.sessions.remove(session) else {
            return;
        };
        if let Some(scope) = state.store_scope() {
            if let Err(err) = self.registry.release(scope) {
                warn!(%session, %err, "failed to close history store");
            }
        }
        info!(%session, "session unregistered");
    }

    fn node_down(&mut self, node: &NodeName) -> usize {
        let gone: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, state)| state.node() == node)
            .map(|(id, _)| id.clone())
            .collect();
        for session in &gone {
            self.teardown(session);
        }
        info!(%node, sessions = gone.len(), "node down");
        gone.len()
    }

    /// Runs `f` on a session together with its store.
    fn with_session<R>(
        &mut self,
        session: &SessionId,
        f: impl FnOnce(&mut SessionState, &mut Ctx<'_>) -> R,
    ) -> Result<R, CoordinatorError> {
        let state = self
            .sessions
            .get_mut(session)
            .ok_or_else(|| CoordinatorError::UnknownSession {
                session: session.clone(),
            })?;
        let store = state
            .store_scope()
            .and_then(|scope| self.registry.get_mut(scope));
        let mut ctx = Ctx {
            config: &self.config,
            validator: self.validator.as_ref(),
            filter: &self.filter,
            store,
        };
        Ok(f(state, &mut ctx))
    }

    /// Runs `f` on an active session's store.
    fn with_store<R>(
        &mut self,
        session: &SessionId,
        f: impl FnOnce(&mut SessionState, &mut DurableStore, &CallFilter, &HistoryConfig) -> Result<R, CoordinatorError>,
    ) -> Result<R, CoordinatorError> {
        let state = self
            .sessions
            .get_mut(session)
            .ok_or_else(|| CoordinatorError::UnknownSession {
                session: session.clone(),
            })?;
        let store = state
            .store_scope()
            .and_then(|scope| self.registry.get_mut(scope))
            .ok_or_else(|| CoordinatorError::HistoryInactive {
                session: session.clone(),
            })?;
        f(state, store, &self.filter, &self.config)
    }

    fn visible_entries(&mut self, session: &SessionId) -> Result<Vec<HistoryEntry>, CoordinatorError> {
        self.with_store(session, |_, store, filter, config| {
            Ok(filter.visible(store.entries(), config.own_calls))
        })
    }

    fn execute(&mut self, session: &SessionId, index: i64) -> Result<String, CoordinatorError> {
        let entries = self.visible_entries(session)?;
        let command = match query::entry_at(&entries, index) {
            Ok(entry) => entry.command().to_owned(),
            Err(err) => {
                self.with_session(session, |state, _| state.drop_staged_binding())?;
                return Err(err.into());
            }
        };
        let evaluated = self.with_session(session, |state, ctx| state.inject(command, ctx))?;
        debug!(%session, index, "executed history entry");
        Ok(evaluated)
    }

    fn send_entry(
        &mut self,
        session: &SessionId,
        index: i64,
        request: fn(String) -> EditorRequest,
    ) -> Result<String, CoordinatorError> {
        let entries = self.visible_entries(session)?;
        let command = query::entry_at(&entries, index)?.command().to_owned();
        self.with_session(session, |state, _| state.send_editor(request(command.clone())))?;
        Ok(command)
    }

    fn clear(&mut self, session: &SessionId) -> Result<usize, CoordinatorError> {
        let removed = self.with_store(session, |state, store, _, _| {
            let removed = store.delete_all()?;
            state.queue_mut().clear();
            Ok(removed)
        })?;
        info!(%session, removed, "history cleared");
        Ok(removed)
    }

    fn clear_range(&mut self, session: &SessionId, range: ListRange) -> Result<usize, CoordinatorError> {
        self.with_store(session, |state, store, filter, config| {
            let entries = filter.visible(store.entries(), config.own_calls);
            let keys: Vec<_> = query::list(&entries, range)?
                .into_iter()
                .map(|listed| listed.entry.key())
                .collect();
            let mut removed = 0;
            for key in keys {
                if store.delete(key)? {
                    removed += 1;
                }
            }
            reseed(state, store, config);
            Ok(removed)
        })
    }

    fn keep_last(&mut self, session: &SessionId, n: usize) -> Result<usize, CoordinatorError> {
        self.with_store(session, |state, store, _, config| {
            let removed = store.evict_oldest(store.size().saturating_sub(n))?;
            reseed(state, store, config);
            Ok(removed)
        })
    }

    fn status(&mut self, session: &SessionId) -> Result<SessionStatus, CoordinatorError> {
        let state = self
            .sessions
            .get(session)
            .ok_or_else(|| CoordinatorError::UnknownSession {
                session: session.clone(),
            })?;
        let store = state.store_scope().and_then(|scope| self.registry.get(scope));
        Ok(SessionStatus {
            session: session.clone(),
            node: state.node().clone(),
            scope: self.config.scope.clone(),
            active: state.is_active(),
            store_path: store.map(|store| store.path().to_path_buf()),
            size: store.map_or(0, DurableStore::size),
            limit: self.config.effective_limit(),
            navigation_depth: state.queue().len(),
            navigation_cap: state.queue().cap(),
            accumulating: matches!(state.mode(), InputMode::Accumulating(_)),
            persists_bindings: self.config.scope.persists_bindings(),
        })
    }

    fn evict_all(&mut self) -> usize {
        let mut total = 0;
        for scope in self.registry.open_scopes() {
            let Some(store) = self.registry.get_mut(&scope) else {
                continue;
            };
            match evict_over_limit(store, &self.config) {
                Ok(0) => {}
                Ok(removed) => {
                    debug!(?scope, removed, remaining = store.size(), "evicted oldest entries");
                    total += removed;
                }
                Err(err) => warn!(?scope, %err, "history eviction failed"),
            }
        }
        total
    }

    fn register_prefix(&mut self, prefix: &str) -> Result<bool, CoordinatorError> {
        if !is_identifier(prefix) {
            return Err(CoordinatorError::InvalidPrefix {
                prefix: prefix.to_owned(),
            });
        }
        Ok(self.filter.register(prefix))
    }

    fn close_all(&mut self) {
        self.sessions.clear();
        for (scope, err) in self.registry.close_all() {
            warn!(?scope, %err, "failed to close history store");
        }
    }
}

/// Removes the oldest batch once `store` has reached the configured limit.
///
/// At least enough entries are removed to bring the store back under the limit.
pub(super) fn evict_over_limit(
    store: &mut DurableStore,
    config: &HistoryConfig,
) -> Result<usize, StoreError> {
    let limit = config.effective_limit();
    let size = store.size();
    if size < limit {
        return Ok(0);
    }
    let count = config.eviction_batch().max(size - limit + 1);
    store.evict_oldest(count)
}

fn reseed(state: &mut SessionState, store: &DurableStore, config: &HistoryConfig) {
    let cap = config.navigation_buffer_size;
    *state.queue_mut() = NavQueue::seeded(cap, config.keep_duplicates, &store.recent(cap));
}
