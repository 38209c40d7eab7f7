// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aquactl-core: data model and small abstractions shared by every other
//! crate in the device-control engine — devices, groups, targets, action
//! records, retry policy, execution reports, scheduled jobs, health state,
//! and the testable clock.

pub mod macros;

pub mod actions;
pub mod clock;
pub mod device;
pub mod error;
pub mod execution_report;
pub mod group;
pub mod health;
pub mod retry_policy;
pub mod scheduled_job;
pub mod target;

pub use actions::{ActionKind, ActionRecord, Outcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use device::{Credentials, Device, DeviceId, DeviceType, ProbeSpec};
pub use error::{AdapterError, BusyError, ConfigError, PersistenceError, StartupError, ValidationError};
pub use execution_report::ExecutionReport;
pub use group::{Group, GroupId};
pub use health::{AlertEvent, AlertLevel, DeviceHealthState, DeviceStatus, MonitorSample};
pub use retry_policy::RetryPolicy;
pub use scheduled_job::{ScheduledAction, ScheduledJob, ScheduledJobId};
pub use target::DeviceTarget;
