// SPDX-License-Identifier: MIT

//! Scriptable fakes for tests in downstream crates (gated behind `test-support`).
//!
//! `FakeAdapter` and `FakeProber` let the engine crate's tests drive the
//! Retry Executor, Device Manager, and Monitor without opening real sockets.
//! Responses are scripted per device id; a device with no script queued
//! falls back to the adapter's configured default outcome.

use crate::prober::ProbeResult;
use crate::{PowerState, ProtocolAdapter};
use aquactl_core::{AdapterError, Device};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    PowerOn,
    PowerOff,
    QueryPower,
}

/// A `ProtocolAdapter` whose responses are scripted per device id.
///
/// Queue responses with [`FakeAdapter::script_power_on`] etc.; each call
/// pops the front of that device's queue, or returns `default_power_result`
/// if the queue is empty. Every invocation is recorded in `calls()` for
/// assertions about fan-out and ordering.
pub struct FakeAdapter {
    power_on: Mutex<HashMap<String, VecDeque<Result<(), AdapterError>>>>,
    power_off: Mutex<HashMap<String, VecDeque<Result<(), AdapterError>>>>,
    query_power: Mutex<HashMap<String, VecDeque<Result<PowerState, AdapterError>>>>,
    default_power_result: Result<(), AdapterError>,
    calls: Arc<Mutex<Vec<(String, Call)>>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self {
            power_on: Mutex::new(HashMap::new()),
            power_off: Mutex::new(HashMap::new()),
            query_power: Mutex::new(HashMap::new()),
            default_power_result: Ok(()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_power_result(mut self, result: Result<(), AdapterError>) -> Self {
        self.default_power_result = result;
        self
    }

    pub fn script_power_on(&self, device_id: &str, results: impl IntoIterator<Item = Result<(), AdapterError>>) {
        self.power_on.lock().entry(device_id.to_string()).or_default().extend(results);
    }

    pub fn script_power_off(&self, device_id: &str, results: impl IntoIterator<Item = Result<(), AdapterError>>) {
        self.power_off.lock().entry(device_id.to_string()).or_default().extend(results);
    }

    pub fn script_query_power(&self, device_id: &str, results: impl IntoIterator<Item = Result<PowerState, AdapterError>>) {
        self.query_power.lock().entry(device_id.to_string()).or_default().extend(results);
    }

    pub fn calls(&self) -> Vec<(String, Call)> {
        self.calls.lock().clone()
    }

    fn record(&self, device_id: &str, call: Call) {
        self.calls.lock().push((device_id.to_string(), call));
    }
}

#[async_trait]
impl ProtocolAdapter for FakeAdapter {
    async fn power_on(&self, device: &Device, _timeout: Duration, _cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.record(device.id.as_str(), Call::PowerOn);
        let mut scripts = self.power_on.lock();
        scripts
            .get_mut(device.id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.default_power_result)
    }

    async fn power_off(&self, device: &Device, _timeout: Duration, _cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.record(device.id.as_str(), Call::PowerOff);
        let mut scripts = self.power_off.lock();
        scripts
            .get_mut(device.id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.default_power_result)
    }

    async fn query_power(&self, device: &Device, _timeout: Duration, _cancel: &CancellationToken) -> Result<PowerState, AdapterError> {
        self.record(device.id.as_str(), Call::QueryPower);
        let mut scripts = self.query_power.lock();
        scripts
            .get_mut(device.id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PowerState::Unknown))
    }
}

/// A scriptable stand-in for [`crate::prober::probe`], for Monitor tests.
pub struct FakeProber {
    results: Mutex<HashMap<String, VecDeque<ProbeResult>>>,
    default_result: ProbeResult,
}

impl Default for FakeProber {
    fn default() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            default_result: ProbeResult { reachable: true, latency_ms: 1, detail: "default".to_string() },
        }
    }
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, device_id: &str, results: impl IntoIterator<Item = ProbeResult>) {
        self.results.lock().entry(device_id.to_string()).or_default().extend(results);
    }

    pub fn probe(&self, device_id: &str) -> ProbeResult {
        let mut results = self.results.lock();
        results
            .get_mut(device_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_result.clone())
    }
}
