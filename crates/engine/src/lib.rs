// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aquactl-engine: the device-control engine proper — Device Registry,
//! Retry Executor, Device Manager, Scheduler, and Monitor (§4.1, §4.3-§4.5,
//! §4.8). Protocol adapters and durable storage are separate crates this one
//! depends on; this crate is where they're wired together and fanned out
//! under the shared concurrency budget (§5).

pub mod device_manager;
pub mod monitor;
pub mod registry;
pub mod retry;
pub mod scheduler;

pub use device_manager::{default_adapter_resolver, AdapterResolver, DeviceManager, SharedAdapter};
pub use monitor::{default_prober, BoxProbe, CycleOutcome, Monitor, ProberFn};
pub use registry::Registry;
pub use scheduler::{Scheduler, SchedulerError};
