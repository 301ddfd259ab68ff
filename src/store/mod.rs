// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for history on disk.
//!
//! One append-only JSON-lines log per scope, plus the registry the coordinator uses to share
//! open logs between sessions.

pub mod durable;
pub mod registry;

pub use durable::{DurableStore, StoreError, WriteDurability};
pub use registry::{store_path, RegistryStats, StoreRegistry};
