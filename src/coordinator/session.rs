// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::filter::{CallFilter, CallKind};
use crate::config::{HistoryConfig, OwnCallPolicy};
use crate::model::{
    EditorRequest, EntryKey, EvaluatorRequest, NavKey, NodeName, ProtocolEvent, SessionId,
    StoreScope,
};
use crate::queue::{Direction, NavQueue};
use crate::store::DurableStore;
use crate::validate::{CommandValidator, Completeness};

/// Evaluation outcomes still owed by the evaluator before old slots are dropped.
const MAX_AWAITING: usize = 64;

/// Everything a session transition may touch besides the session itself.
pub(super) struct Ctx<'a> {
    pub(super) config: &'a HistoryConfig,
    pub(super) validator: &'a dyn CommandValidator,
    pub(super) filter: &'a CallFilter,
    pub(super) store: Option<&'a mut DurableStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum InputMode {
    Idle,
    Accumulating(String),
}

#[derive(Debug, Clone)]
struct Recorded {
    key: EntryKey,
    command: String,
    /// `false` when the command collapsed into an identical navigation head.
    queued: bool,
}

/// What an outstanding evaluation notice will settle.
#[derive(Debug, Clone)]
enum Slot {
    /// Evaluated but never stored.
    Unstored,
    /// An execute-by-index call; any binding it staged lives until it completes.
    Exec,
    Stored(Recorded),
}

#[derive(Debug)]
pub(super) struct SessionState {
    id: SessionId,
    node: NodeName,
    store: Option<StoreScope>,
    mode: InputMode,
    revalidate: bool,
    queue: NavQueue,
    /// One slot per command handed to the evaluator, oldest first.
    awaiting: VecDeque<Slot>,
    known_counter: u64,
    staged_binding: Option<String>,
    editor: mpsc::UnboundedSender<EditorRequest>,
    evaluator: mpsc::UnboundedSender<EvaluatorRequest>,
}

impl SessionState {
    pub(super) fn new(
        id: SessionId,
        node: NodeName,
        store: Option<StoreScope>,
        queue: NavQueue,
        editor: mpsc::UnboundedSender<EditorRequest>,
        evaluator: mpsc::UnboundedSender<EvaluatorRequest>,
    ) -> Self {
        Self {
            id,
            node,
            store,
            mode: InputMode::Idle,
            revalidate: false,
            queue,
            awaiting: VecDeque::new(),
            known_counter: 0,
            staged_binding: None,
            editor,
            evaluator,
        }
    }

    pub(super) fn node(&self) -> &NodeName {
        &self.node
    }

    pub(super) fn store_scope(&self) -> Option<&StoreScope> {
        self.store.as_ref()
    }

    pub(super) fn is_active(&self) -> bool {
        self.store.is_some()
    }

    pub(super) fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub(super) fn queue(&self) -> &NavQueue {
        &self.queue
    }

    pub(super) fn queue_mut(&mut self) -> &mut NavQueue {
        &mut self.queue
    }

    pub(super) fn on_event(&mut self, event: ProtocolEvent, ctx: &mut Ctx<'_>) {
        match event {
            ProtocolEvent::Key(code) => self.on_key(code, ctx),
            ProtocolEvent::Submitted(text) => self.on_submitted(&text, ctx),
            ProtocolEvent::Prompt => self.queue.reset(),
            ProtocolEvent::EditorClosed(text) => self.on_editor_closed(&text),
            ProtocolEvent::EvalCompleted { success, counter } => {
                self.on_eval_completed(success, counter, ctx)
            }
        }
    }

    fn on_submitted(&mut self, text: &str, ctx: &mut Ctx<'_>) {
        self.queue.reset();
        if std::mem::take(&mut self.revalidate) {
            if matches!(self.mode, InputMode::Accumulating(_)) {
                debug!(session = %self.id, "discarding partial input after modify");
            }
            self.mode = InputMode::Idle;
        }

        let candidate = match std::mem::replace(&mut self.mode, InputMode::Idle) {
            InputMode::Idle if text.trim().is_empty() => return,
            InputMode::Idle => normalize(text),
            InputMode::Accumulating(mut buffer) => {
                buffer.push_str(text);
                normalize(&buffer)
            }
        };

        match ctx.validator.check(&candidate) {
            Completeness::Complete => self.finish_command(candidate.trim(), ctx),
            Completeness::Incomplete => {
                debug!(session = %self.id, bytes = candidate.len(), "accumulating partial input");
                self.mode = InputMode::Accumulating(candidate);
            }
            Completeness::Invalid => {
                // The evaluator still reports a failure for it.
                debug!(session = %self.id, "dropping input that cannot parse");
                self.push_slot(Slot::Unstored);
            }
        }
    }

    fn on_key(&mut self, code: u8, ctx: &mut Ctx<'_>) {
        let Some(key) = ctx.config.key_bindings.resolve(code) else {
            self.queue.reset();
            return;
        };

        match key {
            NavKey::ScrollOlder | NavKey::ScrollNewer => {
                let direction = if key == NavKey::ScrollOlder {
                    Direction::Older
                } else {
                    Direction::Newer
                };
                match self.queue.advance(direction).map(ToOwned::to_owned) {
                    Some(text) => self.send_editor(EditorRequest::Replace(text)),
                    None => self.send_editor(EditorRequest::Clear),
                }
            }
            NavKey::Enter => {
                let Some(text) = self.queue.displayed().map(ToOwned::to_owned) else {
                    return;
                };
                self.queue.reset();
                self.send_editor(EditorRequest::Clear);
                if ctx.validator.is_complete(&text) {
                    self.mode = InputMode::Idle;
                    self.inject(text, ctx);
                } else {
                    self.send_editor(EditorRequest::Edit(text));
                }
            }
            NavKey::OpenEditor => {
                if let Some(text) = self.queue.displayed().map(ToOwned::to_owned) {
                    self.send_editor(EditorRequest::OpenEditor(text));
                }
            }
            NavKey::Modify => {
                if let Some(text) = self.queue.displayed().map(ToOwned::to_owned) {
                    self.send_editor(EditorRequest::Edit(text));
                    self.revalidate = true;
                }
                self.queue.reset();
            }
            NavKey::Abandon => {
                self.send_editor(EditorRequest::Clear);
                self.queue.reset();
            }
        }
    }

    fn on_editor_closed(&mut self, text: &str) {
        let text = text.trim();
        if self.queue.is_navigating() {
            self.queue.replace_at_cursor(text);
        }
        self.send_editor(EditorRequest::Replace(text.to_owned()));
    }

    fn on_eval_completed(&mut self, success: bool, counter: u64, ctx: &mut Ctx<'_>) {
        if counter < self.known_counter {
            debug!(
                session = %self.id,
                counter,
                known = self.known_counter,
                "ignoring stale evaluation notice"
            );
            return;
        }

        let Some(slot) = self.awaiting.pop_front() else {
            if matches!(self.mode, InputMode::Accumulating(_)) {
                debug!(session = %self.id, "evaluator rejected partial input");
                self.mode = InputMode::Idle;
            }
            return;
        };

        if matches!(slot, Slot::Exec) {
            self.drop_staged_binding();
        }
        if success {
            self.known_counter = counter;
            return;
        }
        if ctx.config.save_invalid_results {
            return;
        }
        let Slot::Stored(recorded) = slot else {
            return;
        };

        if let Some(store) = ctx.store.as_deref_mut() {
            match store.delete(recorded.key) {
                Ok(removed) => {
                    debug!(session = %self.id, key = %recorded.key, removed, "rolled back failed command")
                }
                Err(err) => warn!(session = %self.id, %err, "failed to roll back command"),
            }
        }
        if recorded.queued {
            self.queue.remove_latest(&recorded.command);
        }
    }

    /// Forgets a binding staged by an execute-by-index call that never injected anything.
    pub(super) fn drop_staged_binding(&mut self) {
        if let Some(binding) = self.staged_binding.take() {
            debug!(session = %self.id, %binding, "dropping unused staged binding");
        }
    }

    /// Sends `text` straight to the evaluator and records it, applying a staged binding.
    pub(super) fn inject(&mut self, text: String, ctx: &mut Ctx<'_>) -> String {
        let text = match self.staged_binding.take() {
            Some(binding) => format!("{binding} = {text}"),
            None => text,
        };
        self.send_evaluator(EvaluatorRequest::Evaluate(text.clone()));
        self.finish_command(&text, ctx);
        text
    }

    fn finish_command(&mut self, command: &str, ctx: &mut Ctx<'_>) {
        let slot = self.record(command, ctx);
        self.push_slot(slot);
    }

    fn push_slot(&mut self, slot: Slot) {
        self.awaiting.push_back(slot);
        if self.awaiting.len() > MAX_AWAITING {
            self.awaiting.pop_front();
        }
    }

    fn record(&mut self, command: &str, ctx: &mut Ctx<'_>) -> Slot {
        if self.store.is_none() {
            return Slot::Unstored;
        }

        match ctx.filter.classify(command) {
            CallKind::ExecByIndex { binding } => {
                if ctx.config.prepend_identifiers {
                    self.staged_binding = binding;
                }
                debug!(session = %self.id, staged = ?self.staged_binding, "execute-by-index call not stored");
                return Slot::Exec;
            }
            CallKind::Internal if ctx.config.own_calls == OwnCallPolicy::Discard => {
                debug!(session = %self.id, "internal call discarded");
                return Slot::Unstored;
            }
            CallKind::Internal | CallKind::Plain => {}
        }

        let command = match self.staged_binding.take() {
            Some(binding) => format!("{binding} = {command}"),
            None => command.to_owned(),
        };

        let Some(store) = ctx.store.as_deref_mut() else {
            return Slot::Unstored;
        };
        let key = match store.append(&command) {
            Ok(key) => key,
            Err(err) => {
                warn!(session = %self.id, %err, "dropping command: history write failed");
                return Slot::Unstored;
            }
        };
        let queued = self.queue.insert(&command);
        debug!(session = %self.id, %key, "recorded command");
        Slot::Stored(Recorded {
            key,
            command,
            queued,
        })
    }

    pub(super) fn send_editor(&self, request: EditorRequest) {
        if self.editor.send(request).is_err() {
            debug!(session = %self.id, "line editor channel closed");
        }
    }

    fn send_evaluator(&self, request: EvaluatorRequest) {
        if self.evaluator.send(request).is_err() {
            debug!(session = %self.id, "evaluator channel closed");
        }
    }
}

/// Strips carriage returns and collapses runs of blank lines to one.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    for line in text.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        out.extend(line.chars().filter(|&c| c != '\r'));
    }
    out
}
