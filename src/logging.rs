// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagnostics setup for the binary. Library code only emits `tracing` events.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TIDEMARK_LOG=tidemark=debug`.
pub const LOG_ENV: &str = "TIDEMARK_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber. Does nothing if one is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
