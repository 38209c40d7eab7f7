// SPDX-License-Identifier: MIT

//! Monitor-owned device health state and fleet-level alerts (§3, §4.8).

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Online,
    Offline,
    Unknown,
}

crate::simple_display! {
    DeviceStatus {
        Online => "ONLINE",
        Offline => "OFFLINE",
        Unknown => "UNKNOWN",
    }
}

/// Per-device health state, owned exclusively by the Monitor task.
/// External consumers only ever see a copy-on-publish snapshot (§5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealthState {
    pub device_id: DeviceId,
    pub last_probed_at_ms: Option<u64>,
    pub last_ok_at_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub current_status: DeviceStatus,
    pub status_since_ms: u64,
}

impl DeviceHealthState {
    pub fn new(device_id: DeviceId, now_ms: u64) -> Self {
        Self {
            device_id,
            last_probed_at_ms: None,
            last_ok_at_ms: None,
            consecutive_failures: 0,
            current_status: DeviceStatus::Unknown,
            status_since_ms: now_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
    RedAlert,
}

crate::simple_display! {
    AlertLevel {
        Info => "INFO",
        Warning => "WARNING",
        Critical => "CRITICAL",
        RedAlert => "RED_ALERT",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp_ms: u64,
    pub level: AlertLevel,
    pub message: String,
    pub offline_count: usize,
    pub total_count: usize,
}

/// One Monitor cycle's fleet-wide snapshot, as recorded in the Report Store's
/// monitoring-sample time series (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSample {
    pub cycle_timestamp_ms: u64,
    pub online_count: usize,
    pub offline_count: usize,
    pub total_count: usize,
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
