// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aquactl-storage: the three durable stores the engine writes to — the
//! Action Log, the Report Store, and the Scheduler's job table.
//!
//! Every store here follows the same write discipline: a record is fully
//! serialized in memory, written to a temp file alongside the real one, then
//! the temp file is renamed over it. A rename within the same directory is
//! atomic on every platform this daemon targets, so a reader never observes
//! a half-written file, and a crash mid-write leaves the previous good state
//! in place (§4.5, §4.6).

pub mod action_log;
pub mod report_store;
pub mod schedule_store;

pub use action_log::ActionLogSink;
pub use report_store::ReportStore;
pub use schedule_store::ScheduleStore;
