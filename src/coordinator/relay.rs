// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-session event relay and liveness monitor.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::Command;
use crate::model::{ProtocolEvent, SessionId};

#[derive(Debug)]
pub(super) enum RelayMessage {
    Event(ProtocolEvent),
    Sync(oneshot::Sender<()>),
}

/// Cloneable sender for one session's protocol events, e.g. for the evaluator side.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<RelayMessage>,
}

impl EventSender {
    /// Returns `false` once the session has been torn down.
    pub fn send(&self, event: ProtocolEvent) -> bool {
        self.tx.send(RelayMessage::Event(event)).is_ok()
    }
}

/// A registered session's connection to the coordinator.
///
/// Dropping the link (or calling [`SessionLink::close`]) ends the session: events already sent
/// are still delivered, then the coordinator tears the session down.
#[derive(Debug)]
pub struct SessionLink {
    session: SessionId,
    events: EventSender,
    done: Option<oneshot::Sender<()>>,
    active: bool,
    task: JoinHandle<()>,
}

impl SessionLink {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// `false` when history is disabled for this session (inert scope or unusable store).
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn send(&self, event: ProtocolEvent) -> bool {
        self.events.send(event)
    }

    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Resolves once every event sent before this call has been processed.
    pub async fn sync(&self) -> bool {
        let (reply, done) = oneshot::channel();
        if self.events.tx.send(RelayMessage::Sync(reply)).is_err() {
            return false;
        }
        done.await.is_ok()
    }

    /// Ends the session and waits until its teardown has been queued behind its last event.
    pub async fn close(mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for SessionLink {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

pub(super) fn spawn(
    session: SessionId,
    commands: mpsc::UnboundedSender<Command>,
    active: bool,
) -> SessionLink {
    let (tx, rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = oneshot::channel();
    let task = tokio::spawn(run(session.clone(), rx, done_rx, commands));
    SessionLink {
        session,
        events: EventSender { tx },
        done: Some(done_tx),
        active,
        task,
    }
}

async fn run(
    session: SessionId,
    mut rx: mpsc::UnboundedReceiver<RelayMessage>,
    mut done: oneshot::Receiver<()>,
    commands: mpsc::UnboundedSender<Command>,
) {
    loop {
        tokio::select! {
            biased;
            message = rx.recv() => match message {
                Some(message) => forward(&session, message, &commands),
                None => break,
            },
            _ = &mut done => {
                while let Ok(message) = rx.try_recv() {
                    forward(&session, message, &commands);
                }
                break;
            }
        }
    }

    debug!(%session, "session relay finished");
    let _ = commands.send(Command::SessionDown { session });
}

fn forward(session: &SessionId, message: RelayMessage, commands: &mpsc::UnboundedSender<Command>) {
    let command = match message {
        RelayMessage::Event(event) => Command::Event {
            session: session.clone(),
            event,
        },
        RelayMessage::Sync(reply) => Command::Sync { reply },
    };
    let _ = commands.send(command);
}
