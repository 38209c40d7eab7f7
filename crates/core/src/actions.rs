// SPDX-License-Identifier: MIT

//! Action records: the append-only, per-attempt-terminus audit trail emitted
//! by the retry executor (§3, §4.6).

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    TurnOn,
    TurnOff,
    Query,
    Probe,
}

crate::simple_display! {
    ActionKind {
        TurnOn => "TURN_ON",
        TurnOff => "TURN_OFF",
        Query => "QUERY",
        Probe => "PROBE",
    }
}

/// Terminal classification of one action attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Fail,
    Timeout,
    ProtocolError,
    Unreachable,
}

crate::simple_display! {
    Outcome {
        Success => "SUCCESS",
        Fail => "FAIL",
        Timeout => "TIMEOUT",
        ProtocolError => "PROTOCOL_ERROR",
        Unreachable => "UNREACHABLE",
    }
}

/// One append-only record of an action attempt terminus.
///
/// Never rewritten; `timestamp`/append order give the log its total order
/// (§3 invariants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub timestamp_ms: u64,
    pub device_id: DeviceId,
    pub action: ActionKind,
    pub attempts: u32,
    pub outcome: Outcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set when cancellation cut the attempt sequence short (§4.3).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl ActionRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ActionRecordBuilder => ActionRecord {
        set {
            timestamp_ms: u64 = 0,
            device_id: DeviceId = DeviceId::from("d1"),
            action: ActionKind = ActionKind::TurnOn,
            attempts: u32 = 1,
            outcome: Outcome = Outcome::Success,
            duration_ms: u64 = 0,
            cancelled: bool = false,
        }
        option {
            error_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
