// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aquactl-daemon: the control-plane process — configuration loading, the
//! wired-together [`engine::Engine`], the HTTP surface, and logging setup.
//! `main.rs` is a thin shell around what's exported here so integration
//! tests can exercise the same pieces the binary runs.

pub mod config;
pub mod engine;
pub mod http;
pub mod logging;
pub mod logquery;

pub use config::DaemonConfig;
pub use engine::Engine;
