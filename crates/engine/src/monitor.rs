// SPDX-License-Identifier: MIT

//! Monitor (§4.8): periodically probes every registered device, tracks
//! per-device health state, and emits fleet-level alerts.
//!
//! `DeviceHealthState` is owned exclusively by the Monitor task (§5) — the
//! lock here is only ever held for the duration of a `RwLock` read/write,
//! never across an `.await`, so external readers calling [`Monitor::snapshot`]
//! never block on an in-flight probe cycle.

use crate::registry::Registry;
use aquactl_adapters::prober::ProbeResult;
use aquactl_core::{
    ActionKind, ActionRecord, AlertEvent, AlertLevel, Clock, DeviceHealthState, DeviceId, DeviceStatus, MonitorSample, Outcome,
};
use aquactl_storage::{ActionLogSink, ReportStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub type BoxProbe = Pin<Box<dyn Future<Output = ProbeResult> + Send>>;
pub type ProberFn = Arc<dyn Fn(&aquactl_core::Device) -> BoxProbe + Send + Sync>;

/// The real prober used outside of tests: delegates to
/// `aquactl_adapters::prober::probe`.
pub fn default_prober() -> ProberFn {
    Arc::new(|device: &aquactl_core::Device| {
        let device = device.clone();
        Box::pin(async move { aquactl_adapters::prober::probe(&device).await })
    })
}

/// Minimum consecutive failed probes before an ONLINE device is marked
/// OFFLINE — the debounce rule that suppresses transient jitter (§4.8).
const OFFLINE_DEBOUNCE_THRESHOLD: u32 = 2;

/// `> 20%` offline triggers RED_ALERT; `>= 3` devices (and `<= 20%`) triggers
/// CRITICAL (§4.8).
const RED_ALERT_RATIO: f64 = 0.20;
const CRITICAL_MIN_COUNT: usize = 3;

pub struct Monitor<C: Clock> {
    registry: Registry,
    health: RwLock<HashMap<DeviceId, DeviceHealthState>>,
    semaphore: Arc<Semaphore>,
    clock: C,
    action_log: Arc<ActionLogSink>,
    report_store: Arc<ReportStore>,
    prober: ProberFn,
}

/// One outcome of a cycle: the fleet-wide sample, plus at most one alert
/// (§4.8: "Emit at most one alert event per cycle, at the highest triggered
/// level").
pub struct CycleOutcome {
    pub sample: MonitorSample,
    pub alert: Option<AlertEvent>,
}

impl<C: Clock> Monitor<C> {
    pub fn new(
        registry: Registry,
        semaphore: Arc<Semaphore>,
        clock: C,
        action_log: Arc<ActionLogSink>,
        report_store: Arc<ReportStore>,
        prober: ProberFn,
    ) -> Self {
        let now_ms = clock.epoch_ms();
        let health = registry.all().into_iter().map(|d| (d.id.clone(), DeviceHealthState::new(d.id.clone(), now_ms))).collect();
        Self { registry, health: RwLock::new(health), semaphore, clock, action_log, report_store, prober }
    }

    /// Copy-on-publish snapshot of per-device health state (§5).
    pub fn snapshot(&self) -> Vec<DeviceHealthState> {
        self.health.read().values().cloned().collect()
    }

    pub fn device_status(&self, device_id: &str) -> Option<DeviceStatus> {
        self.health.read().get(device_id).map(|s| s.current_status)
    }

    /// Runs one probe sweep over every device in the registry, concurrently
    /// under the shared semaphore (§4.8, §5), updates health state, and
    /// persists the resulting sample + at most one alert.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let devices = self.registry.all();
        let now_ms = self.clock.epoch_ms();

        let mut join_set = tokio::task::JoinSet::new();
        for device in devices {
            let device = device.clone();
            let semaphore = self.semaphore.clone();
            let prober = self.prober.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = prober(&device).await;
                (device.id, result)
            });
        }

        let mut results: Vec<(DeviceId, ProbeResult)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok(pair) = joined {
                results.push(pair);
            }
        }

        let mut recovered = Vec::new();
        let mut newly_offline = Vec::new();
        {
            let mut health = self.health.write();
            for (device_id, result) in &results {
                let state = health
                    .entry(device_id.clone())
                    .or_insert_with(|| DeviceHealthState::new(device_id.clone(), now_ms));
                let prior_status = state.current_status;
                state.last_probed_at_ms = Some(now_ms);
                if result.reachable {
                    state.last_ok_at_ms = Some(now_ms);
                    state.consecutive_failures = 0;
                    if prior_status != DeviceStatus::Online {
                        state.current_status = DeviceStatus::Online;
                        state.status_since_ms = now_ms;
                        if prior_status == DeviceStatus::Offline {
                            recovered.push(device_id.clone());
                        }
                    }
                } else {
                    state.consecutive_failures += 1;
                    match prior_status {
                        DeviceStatus::Online => {
                            if state.consecutive_failures >= OFFLINE_DEBOUNCE_THRESHOLD {
                                state.current_status = DeviceStatus::Offline;
                                state.status_since_ms = now_ms;
                                newly_offline.push(device_id.clone());
                            }
                        }
                        DeviceStatus::Unknown => {
                            state.current_status = DeviceStatus::Offline;
                            state.status_since_ms = now_ms;
                            newly_offline.push(device_id.clone());
                        }
                        DeviceStatus::Offline => {}
                    }
                }

                let record = ActionRecord {
                    timestamp_ms: now_ms,
                    device_id: device_id.clone(),
                    action: ActionKind::Probe,
                    attempts: 1,
                    outcome: if result.reachable { Outcome::Success } else { Outcome::Unreachable },
                    duration_ms: result.latency_ms,
                    error_message: if result.reachable { None } else { Some(result.detail.clone()) },
                    cancelled: false,
                };
                if let Err(e) = self.action_log.append(&record) {
                    tracing::warn!(error = %e, device = %device_id, "failed to append probe action log record");
                }
            }
        }

        let online_count = self.health.read().values().filter(|s| s.current_status == DeviceStatus::Online).count();
        let total_count = self.health.read().len();
        let offline_count = total_count.saturating_sub(online_count);

        let sample = MonitorSample { cycle_timestamp_ms: now_ms, online_count, offline_count, total_count };
        if let Err(e) = self.report_store.append_sample(sample) {
            tracing::warn!(error = %e, "failed to persist monitor sample");
        }

        let alert = self.derive_alert(now_ms, &recovered, &newly_offline, offline_count, total_count);
        if let Some(alert) = &alert {
            if let Err(e) = self.report_store.append_alert(alert) {
                tracing::warn!(error = %e, "failed to persist alert event");
            }
            let record = ActionRecord {
                timestamp_ms: now_ms,
                device_id: DeviceId::from("fleet"),
                action: ActionKind::Probe,
                attempts: 1,
                outcome: Outcome::Success,
                duration_ms: 0,
                error_message: Some(alert.message.clone()),
                cancelled: false,
            };
            if let Err(e) = self.action_log.append(&record) {
                tracing::warn!(error = %e, "failed to append alert action log record");
            }
        }

        CycleOutcome { sample, alert }
    }

    /// Picks the single highest-severity alert this cycle triggered (§4.8).
    fn derive_alert(
        &self,
        now_ms: u64,
        recovered: &[DeviceId],
        newly_offline: &[DeviceId],
        offline_count: usize,
        total_count: usize,
    ) -> Option<AlertEvent> {
        let offline_ratio = if total_count == 0 { 0.0 } else { offline_count as f64 / total_count as f64 };

        let level = if offline_ratio > RED_ALERT_RATIO {
            Some(AlertLevel::RedAlert)
        } else if offline_count >= CRITICAL_MIN_COUNT {
            Some(AlertLevel::Critical)
        } else if !newly_offline.is_empty() {
            Some(AlertLevel::Warning)
        } else if !recovered.is_empty() {
            Some(AlertLevel::Info)
        } else {
            None
        };

        level.map(|level| {
            let message = match level {
                AlertLevel::RedAlert => format!("{offline_count}/{total_count} devices offline ({:.0}%)", offline_ratio * 100.0),
                AlertLevel::Critical => format!("{offline_count}/{total_count} devices offline"),
                AlertLevel::Warning => {
                    format!("{} went offline", newly_offline.iter().map(DeviceId::as_str).collect::<Vec<_>>().join(", "))
                }
                AlertLevel::Info => {
                    format!("{} recovered", recovered.iter().map(DeviceId::as_str).collect::<Vec<_>>().join(", "))
                }
            };
            AlertEvent { timestamp_ms: now_ms, level, message, offline_count, total_count }
        })
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
