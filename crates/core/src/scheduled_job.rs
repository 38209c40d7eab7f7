// SPDX-License-Identifier: MIT

//! Persistent cron-like scheduled jobs (§3, §4.5).

use crate::actions::ActionKind;
use crate::target::DeviceTarget;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a scheduled job.
    pub struct ScheduledJobId("sjob_");
}

/// A scheduled on/off command. `action` is restricted to `TurnOn`/`TurnOff`
/// at the type level — scheduling a `Query` or `Probe` doesn't make sense
/// for this component, unlike the ad-hoc API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledAction {
    TurnOn,
    TurnOff,
}

impl From<ScheduledAction> for ActionKind {
    fn from(a: ScheduledAction) -> Self {
        match a {
            ScheduledAction::TurnOn => ActionKind::TurnOn,
            ScheduledAction::TurnOff => ActionKind::TurnOff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: ScheduledJobId,
    /// Five-field minute/hour/day/month/weekday cron expression, evaluated
    /// in the configured timezone.
    pub cron_expr: String,
    pub action: ScheduledAction,
    pub target: DeviceTarget,
    pub enabled: bool,
    /// Epoch ms of the next scheduled fire, persisted alongside the job so
    /// a restart doesn't need to touch the callback to know when it's due
    /// (§4.5). `None` until the scheduler has computed it at least once.
    #[serde(default)]
    pub next_run_ms: Option<u64>,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ScheduledJobBuilder => ScheduledJob {
        into {
            cron_expr: String = "0 21 * * *",
        }
        set {
            id: ScheduledJobId = ScheduledJobId::new(),
            action: ScheduledAction = ScheduledAction::TurnOff,
            target: DeviceTarget = DeviceTarget::All,
            enabled: bool = true,
        }
        option {
            next_run_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "scheduled_job_tests.rs"]
mod tests;
