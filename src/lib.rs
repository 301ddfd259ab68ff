// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tidemark: persistent, searchable and key-navigable history for interactive shell sessions.
//!
//! The [`coordinator`] is the entry point for hosts: it registers sessions, watches their
//! protocol events, and records completed commands into per-scope [`store`]s.

pub mod config;
pub mod coordinator;
pub mod logging;
pub mod model;
pub mod query;
pub mod queue;
pub mod store;
pub mod validate;
