// SPDX-License-Identifier: MIT

//! Generic TCP adapter (§4.2).
//!
//! Used for equipment that has no power-control protocol the engine speaks
//! but whose reachability the Monitor still wants tracked. `query_power`
//! reports reachability via a plain connect; `power_on`/`power_off` always
//! fail, since there is no command to send.

use crate::{with_deadline, PowerState, ProtocolAdapter};
use aquactl_core::{AdapterError, Device};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

pub struct GenericTcpAdapter;

#[async_trait]
impl ProtocolAdapter for GenericTcpAdapter {
    async fn power_on(&self, _device: &Device, _timeout: Duration, _cancel: &CancellationToken) -> Result<(), AdapterError> {
        Err(AdapterError::Protocol)
    }

    async fn power_off(&self, _device: &Device, _timeout: Duration, _cancel: &CancellationToken) -> Result<(), AdapterError> {
        Err(AdapterError::Protocol)
    }

    async fn query_power(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<PowerState, AdapterError> {
        with_deadline(timeout, cancel, async {
            match TcpStream::connect((device.host.as_str(), device.port)).await {
                Ok(_) => Ok(PowerState::On),
                Err(_) => Ok(PowerState::Off),
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "generic_tcp_tests.rs"]
mod tests;
