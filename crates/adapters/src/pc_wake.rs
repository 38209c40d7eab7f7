// SPDX-License-Identifier: MIT

//! PC wake adapter (§4.2).
//!
//! `power_on` broadcasts a Wake-on-LAN magic packet over UDP; there is no
//! session and no acknowledgement to wait for, so success only means the
//! packet left the host. `power_off` requires a configured management
//! channel (a small TCP control port on the exposition PC) and fails closed
//! — an unconfigured management channel is a `PROTOCOL_ERROR`, never a
//! silent success, per §4.2's explicit warning against that failure mode.

use crate::{require_wake_mac, with_deadline, PowerState, ProtocolAdapter};
use aquactl_core::{AdapterError, Credentials, Device};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;

const MAGIC_PACKET_REPEATS: usize = 16;
const WOL_PORT: u16 = 9;
const SHUTDOWN_COMMAND: &[u8] = b"SHUTDOWN\r\n";
const SHUTDOWN_ACK: &str = "OK";

pub struct PcWakeAdapter;

#[async_trait]
impl ProtocolAdapter for PcWakeAdapter {
    async fn power_on(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        let mac = require_wake_mac(&device.credentials)?;
        let packet = magic_packet(mac)?;
        with_deadline(timeout, cancel, async {
            let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|_| AdapterError::Unreachable)?;
            socket.set_broadcast(true).map_err(|_| AdapterError::Unreachable)?;
            socket
                .send_to(&packet, ("255.255.255.255", WOL_PORT))
                .await
                .map_err(|_| AdapterError::Unreachable)?;
            Ok(())
        })
        .await
    }

    async fn power_off(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        let (host, port) = management_channel(&device.credentials)?;
        with_deadline(timeout, cancel, async {
            let mut stream = TcpStream::connect((host, port)).await.map_err(|_| AdapterError::Unreachable)?;
            stream.write_all(SHUTDOWN_COMMAND).await.map_err(|_| AdapterError::Unreachable)?;
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.map_err(|_| AdapterError::Unreachable)?;
            if n == 0 {
                return Err(AdapterError::Unreachable);
            }
            let response = String::from_utf8_lossy(&buf[..n]);
            if response.contains(SHUTDOWN_ACK) {
                Ok(())
            } else {
                Err(AdapterError::Protocol)
            }
        })
        .await
    }

    async fn query_power(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<PowerState, AdapterError> {
        let (host, port) = management_channel(&device.credentials)?;
        with_deadline(timeout, cancel, async {
            match TcpStream::connect((host, port)).await {
                Ok(_) => Ok(PowerState::On),
                Err(_) => Ok(PowerState::Off),
            }
        })
        .await
    }
}

/// A standard magic packet: six `0xFF` bytes followed by the target MAC
/// address repeated 16 times.
fn magic_packet(mac: &str) -> Result<Vec<u8>, AdapterError> {
    let bytes = parse_mac(mac)?;
    let mut packet = Vec::with_capacity(6 + 6 * MAGIC_PACKET_REPEATS);
    packet.extend_from_slice(&[0xFF; 6]);
    for _ in 0..MAGIC_PACKET_REPEATS {
        packet.extend_from_slice(&bytes);
    }
    Ok(packet)
}

fn parse_mac(mac: &str) -> Result<[u8; 6], AdapterError> {
    let mut out = [0u8; 6];
    let parts: Vec<&str> = mac.split(|c| c == ':' || c == '-').collect();
    if parts.len() != 6 {
        return Err(AdapterError::Protocol);
    }
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = u8::from_str_radix(part, 16).map_err(|_| AdapterError::Protocol)?;
    }
    Ok(out)
}

fn management_channel(credentials: &Credentials) -> Result<(&str, u16), AdapterError> {
    match credentials {
        Credentials::Wake { management_host: Some(host), management_port: Some(port), .. } => Ok((host.as_str(), *port)),
        _ => Err(AdapterError::Protocol),
    }
}

#[cfg(test)]
#[path = "pc_wake_tests.rs"]
mod tests;
