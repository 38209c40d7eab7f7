// SPDX-License-Identifier: MIT

//! Scheduler (§4.5): a persistent cron-like job store that fires bulk
//! on/off commands against the Device Manager at configured local times.
//!
//! Mutations are synchronous: the durable record lands in [`ScheduleStore`]
//! before the in-memory job table is updated, and a failed write leaves the
//! in-memory table untouched (§4.5, §7). A missed fire during downtime is
//! never replayed — `due_jobs` only ever looks forward from `now`, so a job
//! whose `next_run_ms` is long past simply gets rescheduled to its next
//! future occurrence the first time the tick loop notices it.

use aquactl_core::{DeviceTarget, PersistenceError, ScheduledAction, ScheduledJob, ScheduledJobId};
use aquactl_storage::ScheduleStore;
use chrono::TimeZone;
use chrono_tz::Tz;
use cron::Schedule;
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("unknown scheduled job id: {0}")]
    UnknownJob(String),
}

/// Durable job table plus the local timezone cron expressions are evaluated
/// in. Reads take a cloned snapshot (§5: "reads take a snapshot reference")
/// rather than holding the lock, so resolving due jobs never blocks a
/// concurrent mutation for longer than the clone.
pub struct Scheduler {
    store: Arc<ScheduleStore>,
    jobs: RwLock<Vec<ScheduledJob>>,
    timezone: Tz,
}

impl Scheduler {
    /// Loads the job table from `store`, computing `next_run_ms` for any
    /// enabled job that doesn't have one yet (first run, or a job added by
    /// hand to the store file). The store must tolerate being absent on
    /// first run — that self-initialization lives in `ScheduleStore::open`.
    pub fn load(store: Arc<ScheduleStore>, timezone: Tz, now_ms: u64) -> Result<Self, SchedulerError> {
        let mut jobs = store.load()?;
        let mut changed = false;
        for job in jobs.iter_mut() {
            if job.enabled && job.next_run_ms.is_none() {
                job.next_run_ms = next_run_after(&job.cron_expr, timezone, now_ms).ok();
                changed = true;
            }
        }
        if changed {
            store.save(&jobs)?;
        }
        Ok(Self { store, jobs: RwLock::new(jobs), timezone })
    }

    pub fn snapshot(&self) -> Vec<ScheduledJob> {
        self.jobs.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<ScheduledJob> {
        self.jobs.read().iter().find(|j| j.id.as_str() == id).cloned()
    }

    pub fn create(&self, cron_expr: String, action: ScheduledAction, target: DeviceTarget, now_ms: u64) -> Result<ScheduledJob, SchedulerError> {
        validate_cron(&cron_expr)?;
        let next_run_ms = next_run_after(&cron_expr, self.timezone, now_ms).ok();
        let job = ScheduledJob { id: ScheduledJobId::new(), cron_expr, action, target, enabled: true, next_run_ms };
        self.mutate(|jobs| jobs.push(job.clone()))?;
        Ok(job)
    }

    /// Full replace of a job's schedule/target/action, recomputing
    /// `next_run_ms` against the new cron expression if one was given.
    pub fn update(
        &self,
        id: &str,
        cron_expr: Option<String>,
        action: Option<ScheduledAction>,
        target: Option<DeviceTarget>,
        now_ms: u64,
    ) -> Result<ScheduledJob, SchedulerError> {
        if let Some(expr) = &cron_expr {
            validate_cron(expr)?;
        }
        let mut updated = None;
        self.mutate(|jobs| {
            if let Some(job) = jobs.iter_mut().find(|j| j.id.as_str() == id) {
                if let Some(expr) = cron_expr {
                    job.next_run_ms = next_run_after(&expr, self.timezone, now_ms).ok();
                    job.cron_expr = expr;
                }
                if let Some(action) = action {
                    job.action = action;
                }
                if let Some(target) = target {
                    job.target = target;
                }
                updated = Some(job.clone());
            }
        })?;
        updated.ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))
    }

    pub fn set_enabled(&self, id: &str, enabled: bool, now_ms: u64) -> Result<ScheduledJob, SchedulerError> {
        let mut updated = None;
        self.mutate(|jobs| {
            if let Some(job) = jobs.iter_mut().find(|j| j.id.as_str() == id) {
                job.enabled = enabled;
                if enabled && job.next_run_ms.is_none() {
                    job.next_run_ms = next_run_after(&job.cron_expr, self.timezone, now_ms).ok();
                }
                updated = Some(job.clone());
            }
        })?;
        updated.ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), SchedulerError> {
        let mut found = false;
        self.mutate(|jobs| {
            let before = jobs.len();
            jobs.retain(|j| j.id.as_str() != id);
            found = jobs.len() != before;
        })?;
        if found {
            Ok(())
        } else {
            Err(SchedulerError::UnknownJob(id.to_string()))
        }
    }

    /// Jobs whose `next_run_ms` has passed as of `now_ms`. Advances each
    /// returned job's `next_run_ms` to its next future occurrence and
    /// persists before returning — a crash between firing and persisting
    /// would otherwise refire the same job on restart.
    ///
    /// Results are sorted by job id (lexicographic), the documented tiebreak
    /// for jobs that fire in the same tick (§9 open question).
    pub fn due_jobs(&self, now_ms: u64) -> Vec<ScheduledJob> {
        let mut jobs = self.jobs.read().clone();
        let mut due = Vec::new();
        let mut changed = false;
        for job in jobs.iter_mut() {
            if !job.enabled {
                continue;
            }
            if let Some(next) = job.next_run_ms {
                if next <= now_ms {
                    due.push(job.clone());
                    job.next_run_ms = next_run_after(&job.cron_expr, self.timezone, now_ms).ok();
                    changed = true;
                }
            }
        }
        if changed {
            match self.store.save(&jobs) {
                Ok(()) => *self.jobs.write() = jobs,
                Err(e) => tracing::warn!(error = %e, "failed to persist rescheduled next_run_ms"),
            }
        }
        due.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        due
    }
}

fn validate_cron(expr: &str) -> Result<(), SchedulerError> {
    parse_schedule(expr).map(|_| ())
}

/// Parses a five-field minute/hour/day/month/weekday expression. The `cron`
/// crate's grammar requires a leading seconds field, so a `0 ` is prepended —
/// every fire happens on the minute boundary.
fn parse_schedule(expr: &str) -> Result<Schedule, SchedulerError> {
    let six_field = format!("0 {expr}");
    Schedule::from_str(&six_field).map_err(|e| SchedulerError::InvalidCron { expr: expr.to_string(), reason: e.to_string() })
}

fn next_run_after(expr: &str, timezone: Tz, after_ms: u64) -> Result<u64, SchedulerError> {
    let schedule = parse_schedule(expr)?;
    let after = timezone
        .timestamp_millis_opt(after_ms as i64)
        .single()
        .ok_or_else(|| SchedulerError::InvalidCron { expr: expr.to_string(), reason: "ambiguous reference instant".to_string() })?;
    schedule
        .after(&after)
        .next()
        .map(|dt| dt.timestamp_millis() as u64)
        .ok_or_else(|| SchedulerError::InvalidCron { expr: expr.to_string(), reason: "no future occurrence".to_string() })
}

impl Scheduler {
    /// Writes the durable record first; on failure, leaves the in-memory
    /// table exactly as it was (§4.5, §7 `PersistenceError` contract).
    fn mutate(&self, f: impl FnOnce(&mut Vec<ScheduledJob>)) -> Result<(), SchedulerError> {
        let mut candidate = self.jobs.read().clone();
        f(&mut candidate);
        self.store.save(&candidate)?;
        *self.jobs.write() = candidate;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
