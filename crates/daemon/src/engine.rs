// SPDX-License-Identifier: MIT

//! Wires the Device Registry, Device Manager, Scheduler, and Monitor into
//! the one value the HTTP layer and the background tick loops share.
//!
//! Everything here is `Arc`-backed and cheap to clone into an axum `State`
//! or a spawned tick task; the pieces that actually need interior
//! mutability (the Scheduler's job table, the Monitor's health map) already
//! guard it themselves (§5).

use crate::config::DaemonConfig;
use aquactl_core::{
    ActionKind, ActionRecord, Clock, DeviceId, DeviceTarget, ExecutionReport, Outcome, ScheduledAction, ScheduledJob, StartupError,
    SystemClock,
};
use aquactl_engine::{
    default_adapter_resolver, default_prober, AdapterResolver, DeviceManager, Monitor, ProberFn, Registry, Scheduler, SchedulerError,
};
use aquactl_storage::{ActionLogSink, ReportStore, ScheduleStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Everything the running daemon needs, built once at startup from a
/// [`DaemonConfig`] and held for the life of the process.
pub struct Engine {
    pub registry: Registry,
    pub device_manager: Arc<DeviceManager<SystemClock>>,
    pub scheduler: Arc<Scheduler>,
    pub monitor: Arc<Monitor<SystemClock>>,
    pub action_log: Arc<ActionLogSink>,
    pub report_store: Arc<ReportStore>,
    pub log_dir: PathBuf,
    pub report_dir: PathBuf,
    pub monitor_interval: Duration,
    pub timezone: chrono_tz::Tz,
    pub shutdown: CancellationToken,
    started_at: Instant,
}

impl Engine {
    pub fn build(config: &DaemonConfig) -> Result<Self, StartupError> {
        Self::assemble(config, default_adapter_resolver(), default_prober())
    }

    /// Same wiring as [`Engine::build`], but with the adapter dispatch table
    /// and health prober substituted — used by tests that need a running
    /// `Engine` without touching real sockets.
    #[cfg(any(test, feature = "test-support"))]
    pub fn build_with(config: &DaemonConfig, adapter_resolver: AdapterResolver, prober: ProberFn) -> Result<Self, StartupError> {
        Self::assemble(config, adapter_resolver, prober)
    }

    fn assemble(config: &DaemonConfig, adapter_resolver: AdapterResolver, prober: ProberFn) -> Result<Self, StartupError> {
        let doc = &config.document;
        let registry = Registry::load(doc.devices.clone(), doc.groups.clone())?;

        let action_log = Arc::new(ActionLogSink::open(&doc.log_dir).map_err(StartupError::ActionLog)?);
        let report_store = Arc::new(ReportStore::open(&doc.report_dir).map_err(StartupError::ReportStore)?);
        let schedule_store = Arc::new(ScheduleStore::open(&doc.schedule_db_path).map_err(StartupError::ScheduleStore)?);

        let clock = SystemClock;
        let device_manager = Arc::new(DeviceManager::new(
            registry.clone(),
            doc.max_concurrency,
            doc.retry,
            clock.clone(),
            action_log.clone(),
            adapter_resolver,
        ));

        let scheduler = Arc::new(
            Scheduler::load(schedule_store, config.timezone, clock.epoch_ms())
                .map_err(|e| StartupError::Scheduler(e.to_string()))?,
        );

        let monitor = Arc::new(Monitor::new(
            registry.clone(),
            device_manager.semaphore(),
            clock,
            action_log.clone(),
            report_store.clone(),
            prober,
        ));

        Ok(Self {
            registry,
            device_manager,
            scheduler,
            monitor,
            action_log,
            report_store,
            log_dir: doc.log_dir.clone(),
            report_dir: doc.report_dir.clone(),
            monitor_interval: Duration::from_secs(doc.monitor_interval_sec),
            timezone: config.timezone,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        })
    }

    /// A fresh child of the process-wide shutdown token: trips when the
    /// process shuts down like its parent, but can also be tripped on its
    /// own (client disconnect, per-call deadline) without affecting any
    /// other in-flight request (§5 "per-request signals trip on client
    /// disconnect or per-call timeout").
    pub fn request_cancel_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub async fn turn_on(&self, target: &DeviceTarget) -> Result<ExecutionReport, aquactl_core::ValidationError> {
        self.turn_on_with_cancel(target, &self.request_cancel_token()).await
    }

    pub async fn turn_off(&self, target: &DeviceTarget) -> Result<ExecutionReport, aquactl_core::ValidationError> {
        self.turn_off_with_cancel(target, &self.request_cancel_token()).await
    }

    pub async fn query(&self, target: &DeviceTarget) -> Result<ExecutionReport, aquactl_core::ValidationError> {
        self.device_manager.query(target, &self.request_cancel_token()).await
    }

    pub async fn turn_on_with_cancel(
        &self,
        target: &DeviceTarget,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, aquactl_core::ValidationError> {
        self.device_manager.turn_on(target, cancel).await
    }

    pub async fn turn_off_with_cancel(
        &self,
        target: &DeviceTarget,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, aquactl_core::ValidationError> {
        self.device_manager.turn_off(target, cancel).await
    }

    /// Fires every job the Scheduler considers due right now. Jobs due in
    /// the same tick run concurrently — the Scheduler's own ordering only
    /// governs which `next_run_ms` gets recomputed first, not dispatch order
    /// here (§5: "two distinct jobs firing in the same second may
    /// interleave").
    pub async fn run_scheduler_tick(&self) {
        let now_ms = SystemClock.epoch_ms();
        let due = self.scheduler.due_jobs(now_ms);
        if due.is_empty() {
            return;
        }
        let mut handles = Vec::with_capacity(due.len());
        for job in due {
            let device_manager = self.device_manager.clone();
            let report_store = self.report_store.clone();
            let action_log = self.action_log.clone();
            let cancel = self.request_cancel_token();
            handles.push(tokio::spawn(async move {
                let report = run_job_action(&device_manager, &action_log, &job, &cancel).await;
                if let Err(e) = report_store.append_execution(&report) {
                    tracing::warn!(error = %e, job_id = %job.id, "failed to persist scheduled execution report");
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// `POST /schedule/{id}/trigger`: runs a job's action immediately
    /// without touching its `next_run_ms` (§4.5 manual trigger).
    pub async fn trigger_job_now(&self, job_id: &str) -> Result<ExecutionReport, SchedulerError> {
        let job = self.scheduler.get(job_id).ok_or_else(|| SchedulerError::UnknownJob(job_id.to_string()))?;
        let cancel = self.request_cancel_token();
        let report = run_job_action(&self.device_manager, &self.action_log, &job, &cancel).await;
        if let Err(e) = self.report_store.append_execution(&report) {
            tracing::warn!(error = %e, job_id = %job_id, "failed to persist triggered execution report");
        }
        Ok(report)
    }

    pub async fn run_monitor_cycle(&self) -> aquactl_engine::CycleOutcome {
        self.monitor.run_cycle().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

async fn run_job_action(
    device_manager: &DeviceManager<SystemClock>,
    action_log: &ActionLogSink,
    job: &ScheduledJob,
    cancel: &CancellationToken,
) -> ExecutionReport {
    let result = match job.action {
        ScheduledAction::TurnOn => device_manager.turn_on(&job.target, cancel).await,
        ScheduledAction::TurnOff => device_manager.turn_off(&job.target, cancel).await,
    };
    match result {
        Ok(report) => report,
        Err(e) => {
            // A scheduled job's target is resolved fresh on every fire, so a
            // device or group deleted after the job was created shows up
            // here instead of at schedule-creation time. The invariant (§3)
            // is a logged PROTOCOL_ERROR record, not a crash.
            tracing::error!(job_id = %job.id, error = %e, "scheduled job target did not resolve");
            let timestamp_ms = SystemClock.epoch_ms();
            let record = ActionRecord {
                timestamp_ms,
                device_id: DeviceId::from(job.target.to_string()),
                action: ActionKind::from(job.action),
                attempts: 0,
                outcome: Outcome::ProtocolError,
                duration_ms: 0,
                error_message: Some(e.to_string()),
                cancelled: false,
            };
            if let Err(e) = action_log.append(&record) {
                tracing::warn!(error = %e, job_id = %job.id, "failed to append unresolved-target action log record");
            }
            let mut report = ExecutionReport::new(timestamp_ms, ActionKind::from(job.action));
            report.record(record.device_id.clone(), record);
            report.finish(timestamp_ms);
            report
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
