// SPDX-License-Identifier: MIT

//! Error kinds shared across the engine.
//!
//! These map directly onto the outcome classification used throughout the
//! control plane: adapter and probe failures are captured and carried inside
//! `ActionRecord`s rather than propagated as `Err`, but the same kinds show up
//! wherever an operation legitimately needs to fail loudly (config load,
//! target resolution, persistence).

use thiserror::Error;

/// Fatal at startup only: a malformed or inconsistent configuration document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate device id: {0}")]
    DuplicateDeviceId(String),

    #[error("duplicate group id: {0}")]
    DuplicateGroupId(String),

    #[error("group {group} references unknown device {device}")]
    UnknownGroupMember { group: String, device: String },

    #[error("group {group} lists device {device} more than once")]
    DuplicateGroupMember { group: String, device: String },

    #[error("device {0} is missing required fields for its type")]
    MissingRequiredFields(String),

    #[error("device {device} of type {device_type} has no credentials configured")]
    MissingCredentials { device: String, device_type: String },

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCronExpr { expr: String, reason: String },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("failed to read configuration file {path}: {source}")]
    Io { path: String, #[source] source: std::sync::Arc<std::io::Error> },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Daemon startup can fail for reasons beyond a malformed config document —
/// the durable stores it opens have their own failure mode, and §6 assigns
/// those a distinct exit code (3) from a bad config (2).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("schedule store unavailable: {0}")]
    ScheduleStore(#[source] PersistenceError),

    #[error("action log unavailable: {0}")]
    ActionLog(#[source] PersistenceError),

    #[error("report store unavailable: {0}")]
    ReportStore(#[source] PersistenceError),

    #[error("scheduler failed to load: {0}")]
    Scheduler(String),
}

impl StartupError {
    /// Exit code per §6: `2` invalid configuration, `3` durable schedule
    /// store unreadable (generalized here to any durable store).
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => 2,
            StartupError::ScheduleStore(_) | StartupError::ActionLog(_) | StartupError::ReportStore(_) | StartupError::Scheduler(_) => 3,
        }
    }
}

/// Surfaced per-request: the caller asked for something that does not resolve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown device id: {0}")]
    UnknownDevice(String),

    #[error("unknown group id: {0}")]
    UnknownGroup(String),

    #[error("unresolvable target: {0}")]
    UnresolvableTarget(String),
}

/// One outcome kind per terminal state an action attempt can end in.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdapterError {
    #[error("connection refused or host unreachable")]
    Unreachable,

    #[error("operation timed out")]
    Timeout,

    #[error("protocol error")]
    Protocol,
}

/// Raised when a bulk operation would exceed the concurrency budget.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
#[error("engine is at capacity, try again later")]
pub struct BusyError;

/// Raised when a durable write (schedule store, action log, report store) fails.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Clone for PersistenceError {
    fn clone(&self) -> Self {
        match self {
            Self::Io { path, source } => {
                Self::Io { path: path.clone(), source: std::io::Error::new(source.kind(), source.to_string()) }
            }
            Self::Corrupt(s) => Self::Corrupt(s.clone()),
            Self::Serde(e) => Self::Corrupt(e.to_string()),
        }
    }
}
