// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aquactl-adapters: one `ProtocolAdapter` implementation per device family,
//! plus the Health Prober. Every adapter opens a fresh session per call —
//! there is no connection pooling (§4.2).

pub mod generic_tcp;
pub mod jsonrpc;
pub mod pc_wake;
pub mod prober;
pub mod telnet;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use aquactl_core::{AdapterError, Credentials, Device, DeviceType};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Power state as reported by `query_power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

/// Capability set every device-family driver implements (§4.2).
///
/// Each call accepts the per-attempt timeout and a cancellation token; the
/// retry executor is the only caller and owns both the deadline and the
/// process-wide/per-request cancellation signal (§5).
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    async fn power_on(
        &self,
        device: &Device,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    async fn power_off(
        &self,
        device: &Device,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    async fn query_power(
        &self,
        device: &Device,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<PowerState, AdapterError>;
}

/// Select the adapter implementation for a device's protocol family.
///
/// This is the "dynamic protocol dispatch" the design notes call for: a
/// tagged-variant device type plus one `ProtocolAdapter` impl per variant,
/// looked up by tag rather than by a string key (§9).
pub fn adapter_for(device_type: DeviceType) -> &'static dyn ProtocolAdapter {
    match device_type {
        DeviceType::TelnetProjector => &telnet::TelnetProjectorAdapter,
        DeviceType::JsonrpcProjector => &jsonrpc::JsonRpcProjectorAdapter,
        DeviceType::PcWake => &pc_wake::PcWakeAdapter,
        DeviceType::GenericTcp => &generic_tcp::GenericTcpAdapter,
    }
}

/// Races a future against a cancellation token and an I/O deadline, folding
/// both into the adapter error taxonomy. Every adapter call goes through
/// this so the `UNREACHABLE`/`TIMEOUT`/`CANCELLED` split stays consistent.
pub(crate) async fn with_deadline<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, AdapterError>
where
    F: std::future::Future<Output = Result<T, AdapterError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdapterError::Timeout),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(AdapterError::Timeout),
        },
    }
}

pub(crate) fn missing_credentials() -> AdapterError {
    AdapterError::Protocol
}

pub(crate) fn require_wake_mac(credentials: &Credentials) -> Result<&str, AdapterError> {
    match credentials {
        Credentials::Wake { mac, .. } => Ok(mac.as_str()),
        _ => Err(missing_credentials()),
    }
}

pub(crate) fn require_telnet_creds(credentials: &Credentials) -> Result<(&str, &str), AdapterError> {
    match credentials {
        Credentials::Telnet { username, password } => Ok((username.as_str(), password.as_str())),
        _ => Err(missing_credentials()),
    }
}
