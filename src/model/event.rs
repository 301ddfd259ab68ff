// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Messages exchanged with the line editor and the evaluator.

/// A low-level event intercepted between a session's line editor and its evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A raw keystroke byte. Only configured control codes mean anything to the coordinator.
    Key(u8),
    /// A buffer the user submitted to the evaluator (possibly a partial command).
    Submitted(String),
    /// The line editor returned to an empty prompt.
    Prompt,
    /// The external editor closed and handed back (possibly modified) text.
    EditorClosed(String),
    /// The evaluator finished a command. `counter` increments only on success.
    EvalCompleted { success: bool, counter: u64 },
}

/// Dedicated navigation keys, resolved from raw control codes through the key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    ScrollOlder,
    ScrollNewer,
    Enter,
    OpenEditor,
    Modify,
    Abandon,
}

/// A redraw or edit request pushed to a session's line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorRequest {
    /// Move to line start, clear the line, and show `text` without submitting it.
    Replace(String),
    /// Clear the current line.
    Clear,
    /// Put `text` into the editable input buffer, cursor at the end.
    Edit(String),
    /// Insert `text` at the cursor (paste).
    Insert(String),
    /// Open the external editor pre-filled with `text`.
    OpenEditor(String),
}

/// A request pushed to a session's evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorRequest {
    Evaluate(String),
}
