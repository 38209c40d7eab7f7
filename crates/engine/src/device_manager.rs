// SPDX-License-Identifier: MIT

//! Device Manager (§4.4): resolves a target through the Registry, then fans
//! out one Retry Executor call per device under a shared semaphore.
//!
//! Two locks gate every outgoing call (§5): the global semaphore caps total
//! concurrent sockets at `max_concurrency`, and a per-device `tokio::Mutex`
//! — acquired *before* the semaphore permit — serializes calls against the
//! same device id without holding up unrelated devices.

use crate::retry;
use crate::registry::Registry;
use aquactl_adapters::ProtocolAdapter;
use aquactl_core::{
    ActionKind, ActionRecord, BusyError, Clock, DeviceId, DeviceTarget, DeviceType, ExecutionReport, Outcome, RetryPolicy,
    ValidationError,
};
use aquactl_storage::ActionLogSink;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// A device-family adapter, shared rather than `'static`-borrowed so tests
/// can substitute `aquactl_adapters::test_support::FakeAdapter` for the real
/// network-facing implementations.
pub type SharedAdapter = Arc<dyn ProtocolAdapter>;

/// Maps a device type to the adapter that drives it. Built once per
/// `DeviceManager` rather than recomputed per call so tests can swap the
/// whole dispatch table out from under `adapter_for` (§4.2, §4.4).
pub type AdapterResolver = Arc<dyn Fn(DeviceType) -> SharedAdapter + Send + Sync>;

/// The resolver used outside of tests: dispatches to the real per-protocol
/// adapters the same way `aquactl_adapters::adapter_for` does.
pub fn default_adapter_resolver() -> AdapterResolver {
    Arc::new(|device_type: DeviceType| -> SharedAdapter {
        match device_type {
            DeviceType::TelnetProjector => Arc::new(aquactl_adapters::telnet::TelnetProjectorAdapter),
            DeviceType::JsonrpcProjector => Arc::new(aquactl_adapters::jsonrpc::JsonRpcProjectorAdapter),
            DeviceType::PcWake => Arc::new(aquactl_adapters::pc_wake::PcWakeAdapter),
            DeviceType::GenericTcp => Arc::new(aquactl_adapters::generic_tcp::GenericTcpAdapter),
        }
    })
}

/// How long a bulk operation will wait to acquire its first semaphore slot
/// before failing the whole request with `BusyError` (§5 backpressure rule).
const BACKPRESSURE_WAIT: Duration = Duration::from_secs(1);

/// Upper bound on how long one fan-out may run before unfinished devices
/// are given up on and recorded as `TIMEOUT` (§4.4).
const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_secs(600);

pub struct DeviceManager<C: Clock> {
    registry: Registry,
    semaphore: Arc<Semaphore>,
    device_locks: SyncMutex<HashMap<DeviceId, Arc<AsyncMutex<()>>>>,
    retry_policy: RetryPolicy,
    clock: C,
    action_log: Arc<ActionLogSink>,
    overall_deadline: Duration,
    adapter_resolver: AdapterResolver,
}

impl<C: Clock> DeviceManager<C> {
    pub fn new(
        registry: Registry,
        max_concurrency: usize,
        retry_policy: RetryPolicy,
        clock: C,
        action_log: Arc<ActionLogSink>,
        adapter_resolver: AdapterResolver,
    ) -> Self {
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            device_locks: SyncMutex::new(HashMap::new()),
            retry_policy,
            clock,
            action_log,
            overall_deadline: DEFAULT_OVERALL_DEADLINE,
            adapter_resolver,
        }
    }

    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = deadline;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Shared with the Monitor so adapter calls and health probes draw from
    /// one global concurrency budget (§5).
    pub fn semaphore(&self) -> Arc<Semaphore> {
        self.semaphore.clone()
    }

    pub async fn turn_on(&self, target: &DeviceTarget, cancel: &CancellationToken) -> Result<ExecutionReport, ValidationError> {
        self.run(target, ActionKind::TurnOn, cancel).await
    }

    pub async fn turn_off(&self, target: &DeviceTarget, cancel: &CancellationToken) -> Result<ExecutionReport, ValidationError> {
        self.run(target, ActionKind::TurnOff, cancel).await
    }

    pub async fn query(&self, target: &DeviceTarget, cancel: &CancellationToken) -> Result<ExecutionReport, ValidationError> {
        self.run(target, ActionKind::Query, cancel).await
    }

    /// Returns `Err(BusyError)` without resolving the target if the engine
    /// can't make room for this bulk operation within `BACKPRESSURE_WAIT`.
    pub async fn check_capacity(&self) -> Result<(), BusyError> {
        match tokio::time::timeout(BACKPRESSURE_WAIT, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => {
                drop(permit);
                Ok(())
            }
            _ => Err(BusyError),
        }
    }

    async fn run(&self, target: &DeviceTarget, action: ActionKind, cancel: &CancellationToken) -> Result<ExecutionReport, ValidationError> {
        let ids = self.registry.ids_matching(target)?;
        let started_at_ms = self.clock.epoch_ms();
        let mut report = ExecutionReport::new(started_at_ms, action);

        let mut join_set = tokio::task::JoinSet::new();
        for id in &ids {
            let lock = self.device_lock(id);
            let semaphore = self.semaphore.clone();
            let clock = self.clock.clone();
            let cancel = cancel.clone();
            let id = id.clone();
            let device = self.registry.get(id.as_str()).cloned();
            let policy = self.retry_policy;
            let adapter_resolver = self.adapter_resolver.clone();
            join_set.spawn(async move {
                let Some(device) = device else {
                    let record = fallback_record(id.clone(), action, clock.epoch_ms(), Outcome::ProtocolError);
                    return (id, record);
                };
                let _device_guard = lock.lock().await;
                let permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let record = fallback_record(id.clone(), action, clock.epoch_ms(), Outcome::Unreachable);
                        return (id, record);
                    }
                };
                let adapter = adapter_resolver(device.device_type);
                let record = retry::execute(adapter.as_ref(), &device, action, &policy, &clock, &cancel).await;
                drop(permit);
                (id, record)
            });
        }

        // Collect records as they land rather than inside a single timed future:
        // a device that finishes before the deadline must keep its real outcome
        // even if the deadline fires before every sibling has finished (§4.4 —
        // only devices "not yet attempted at the deadline" become TIMEOUT).
        let mut collected = HashMap::new();
        let deadline = tokio::time::Instant::now() + self.overall_deadline;
        loop {
            tokio::select! {
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((id, record))) => {
                            collected.insert(id, record);
                        }
                        Some(Err(_)) => {}
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    join_set.abort_all();
                    break;
                }
            }
        }

        for id in ids {
            let record = collected
                .get(&id)
                .cloned()
                .unwrap_or_else(|| fallback_record(id.clone(), action, self.clock.epoch_ms(), Outcome::Timeout));
            if let Err(e) = self.action_log.append(&record) {
                tracing::warn!(error = %e, device = %id, "failed to append action log record");
            }
            report.record(id, record);
        }

        report.finish(self.clock.epoch_ms());
        Ok(report)
    }

    fn device_lock(&self, id: &DeviceId) -> Arc<AsyncMutex<()>> {
        self.device_locks.lock().entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

fn fallback_record(device_id: DeviceId, action: ActionKind, timestamp_ms: u64, outcome: Outcome) -> ActionRecord {
    ActionRecord {
        timestamp_ms,
        device_id,
        action,
        attempts: 0,
        outcome,
        duration_ms: 0,
        error_message: None,
        cancelled: false,
    }
}

#[cfg(test)]
#[path = "device_manager_tests.rs"]
mod tests;
