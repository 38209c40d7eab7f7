// SPDX-License-Identifier: MIT

//! The result of one Device Manager fan-out (§3, §4.4).

use crate::actions::{ActionKind, ActionRecord};
use crate::device::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub requested_action: ActionKind,
    /// Exactly one entry per requested device (§3 invariant).
    pub results: BTreeMap<DeviceId, ActionRecord>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ExecutionReport {
    pub fn new(started_at_ms: u64, requested_action: ActionKind) -> Self {
        Self {
            started_at_ms,
            finished_at_ms: started_at_ms,
            requested_action,
            results: BTreeMap::new(),
            success_count: 0,
            failure_count: 0,
        }
    }

    pub fn record(&mut self, device_id: DeviceId, record: ActionRecord) {
        if record.is_success() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.results.insert(device_id, record);
    }

    pub fn finish(&mut self, finished_at_ms: u64) {
        self.finished_at_ms = finished_at_ms;
    }
}

#[cfg(test)]
#[path = "execution_report_tests.rs"]
mod tests;
