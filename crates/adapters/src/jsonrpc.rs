// SPDX-License-Identifier: MIT

//! JSON-RPC projector adapter (§4.2).
//!
//! Frames each request as a 4-byte big-endian length prefix followed by the
//! JSON payload on the same TCP connection the banner-less vendor protocol
//! expects. One session per call; the id counter starts at 1 and is never
//! reused across sessions.

use crate::{with_deadline, PowerState, ProtocolAdapter};
use aquactl_core::{AdapterError, Device};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

pub struct JsonRpcProjectorAdapter;

#[async_trait]
impl ProtocolAdapter for JsonRpcProjectorAdapter {
    async fn power_on(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        call(device, timeout, cancel, "set_power", json!({ "state": "on" }), Some("on")).await.map(|_| ())
    }

    async fn power_off(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        call(device, timeout, cancel, "set_power", json!({ "state": "off" }), Some("off")).await.map(|_| ())
    }

    async fn query_power(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<PowerState, AdapterError> {
        let result = call(device, timeout, cancel, "get_power", json!({}), None).await?;
        Ok(match result.get("state").and_then(Value::as_str) {
            Some("on") => PowerState::On,
            Some("off") => PowerState::Off,
            _ => PowerState::Unknown,
        })
    }
}

/// `expected_state`: for `set_power` calls, the `state` the vendor's
/// `result` must echo back for the call to count as a success — a
/// well-formed, non-error response that simply didn't confirm the
/// requested state is still a protocol mismatch, not a success.
async fn call(
    device: &Device,
    timeout: Duration,
    cancel: &CancellationToken,
    method: &str,
    params: Value,
    expected_state: Option<&str>,
) -> Result<Value, AdapterError> {
    with_deadline(timeout, cancel, async {
        let mut stream = TcpStream::connect((device.host.as_str(), device.port))
            .await
            .map_err(|_| AdapterError::Unreachable)?;
        let id = 1u64;
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        write_frame(&mut stream, &request).await?;
        let response = read_frame(&mut stream).await?;
        if response.get("id").and_then(Value::as_u64) != Some(id) {
            return Err(AdapterError::Protocol);
        }
        if response.get("error").is_some() {
            return Err(AdapterError::Protocol);
        }
        let result = response.get("result").cloned().ok_or(AdapterError::Protocol)?;
        if let Some(expected) = expected_state {
            if result.get("state").and_then(Value::as_str) != Some(expected) {
                return Err(AdapterError::Protocol);
            }
        }
        Ok(result)
    })
    .await
}

async fn write_frame(stream: &mut TcpStream, value: &Value) -> Result<(), AdapterError> {
    let body = serde_json::to_vec(value).map_err(|_| AdapterError::Protocol)?;
    let len = u32::try_from(body.len()).map_err(|_| AdapterError::Protocol)?;
    stream.write_all(&len.to_be_bytes()).await.map_err(|_| AdapterError::Unreachable)?;
    stream.write_all(&body).await.map_err(|_| AdapterError::Unreachable)
}

async fn read_frame(stream: &mut TcpStream) -> Result<Value, AdapterError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|_| AdapterError::Unreachable)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.map_err(|_| AdapterError::Unreachable)?;
    serde_json::from_slice(&body).map_err(|_| AdapterError::Protocol)
}

#[cfg(test)]
#[path = "jsonrpc_tests.rs"]
mod tests;
