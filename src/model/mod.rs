// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! Sessions are identified by opaque runtime handles, own a scope-resolved store, and exchange
//! protocol events with their line editor and evaluator.

pub mod entry;
pub mod event;
pub mod ids;
pub mod scope;

pub use entry::{EntryKey, HistoryEntry};
pub use event::{EditorRequest, EvaluatorRequest, NavKey, ProtocolEvent};
pub use ids::{Id, IdError, NodeName, SessionId};
pub use scope::{ParseScopeError, Scope, StoreScope};
