// SPDX-License-Identifier: MIT

//! Tracing setup for the daemon binary.
//!
//! Structured logging only — the log-file rotation a production deployment
//! wants is an external installation concern (§1 Non-goals), so this writes
//! to stdout and lets the process supervisor (systemd, docker, etc.) own
//! rotation and retention.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global subscriber. Respects `RUST_LOG`; defaults to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
