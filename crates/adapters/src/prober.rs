// SPDX-License-Identifier: MIT

//! Health Prober (§4.7).
//!
//! A non-invasive reachability check, independent of the `ProtocolAdapter`
//! capability set: the Monitor calls this on a timer for every device
//! regardless of whether that device's protocol supports power control.
//! Never retries — retry policy, if any, is the Monitor's decision.

use aquactl_core::{Device, ProbeSpec};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Upper bound on a single probe attempt, regardless of the caller's own
/// timeout preferences (§4.7).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub reachable: bool,
    pub latency_ms: u64,
    pub detail: String,
}

/// Probes a device's reachability per its configured `probe_spec`.
///
/// ICMP echo falls back to a TCP connect attempt, since sending raw ICMP
/// requires privileges this daemon is not expected to run with.
pub async fn probe(device: &Device) -> ProbeResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(PROBE_TIMEOUT, run_probe(device)).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(detail)) => ProbeResult { reachable: true, latency_ms, detail },
        Ok(Err(detail)) => ProbeResult { reachable: false, latency_ms, detail },
        Err(_) => ProbeResult { reachable: false, latency_ms, detail: "probe timed out".to_string() },
    }
}

async fn run_probe(device: &Device) -> Result<String, String> {
    match &device.probe_spec {
        ProbeSpec::Icmp => tcp_connect(&device.host, device.port).await,
        ProbeSpec::TcpConnect { port } => tcp_connect(&device.host, *port).await,
        ProbeSpec::Http { path } => http_get(&device.host, device.port, path).await,
    }
}

async fn tcp_connect(host: &str, port: u16) -> Result<String, String> {
    TcpStream::connect((host, port))
        .await
        .map(|_| "tcp connect succeeded".to_string())
        .map_err(|e| e.to_string())
}

async fn http_get(host: &str, port: u16, path: &str) -> Result<String, String> {
    let url = format!("http://{host}:{port}{path}");
    let response = reqwest::get(&url).await.map_err(|e| e.to_string())?;
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        Ok(format!("http status {status}"))
    } else {
        Err(format!("http status {status}"))
    }
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
