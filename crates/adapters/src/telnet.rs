// SPDX-License-Identifier: MIT

//! Telnet-style projector adapter (§4.2).
//!
//! Opens a TCP connection, reads the banner, logs in with
//! `user\r\n` + `password\r\n`, waits for a prompt, then sends the vendor
//! power command. The socket is always closed on the way out, success or not.

use crate::{require_telnet_creds, with_deadline, PowerState, ProtocolAdapter};
use aquactl_core::{AdapterError, Credentials, Device};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

const PROMPT_TOKEN: &str = ">";
const ACK_TOKEN: &str = "OK";
const CMD_ON: &str = "~0000 1\r";
const CMD_OFF: &str = "~0000 0\r";
const CMD_QUERY: &str = "~0000 QPW\r";

pub struct TelnetProjectorAdapter;

#[async_trait]
impl ProtocolAdapter for TelnetProjectorAdapter {
    async fn power_on(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        send_command(device, timeout, cancel, CMD_ON).await
    }

    async fn power_off(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<(), AdapterError> {
        send_command(device, timeout, cancel, CMD_OFF).await
    }

    async fn query_power(&self, device: &Device, timeout: Duration, cancel: &CancellationToken) -> Result<PowerState, AdapterError> {
        with_deadline(timeout, cancel, async {
            let mut session = Session::open(device).await?;
            session.login(&device.credentials).await?;
            let response = session.send_and_await_ack(CMD_QUERY).await?;
            Ok(if response.contains('1') {
                PowerState::On
            } else if response.contains('0') {
                PowerState::Off
            } else {
                PowerState::Unknown
            })
        })
        .await
    }
}

async fn send_command(
    device: &Device,
    timeout: Duration,
    cancel: &CancellationToken,
    command: &str,
) -> Result<(), AdapterError> {
    with_deadline(timeout, cancel, async {
        let mut session = Session::open(device).await?;
        session.login(&device.credentials).await?;
        session.send_and_await_ack(command).await?;
        Ok(())
    })
    .await
}

struct Session {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Session {
    async fn open(device: &Device) -> Result<Self, AdapterError> {
        let stream = TcpStream::connect((device.host.as_str(), device.port))
            .await
            .map_err(|_| AdapterError::Unreachable)?;
        let (read_half, write_half) = stream.into_split();
        let mut session = Session { reader: BufReader::new(read_half), writer: write_half };
        // Banner: discard the first line before attempting login.
        let _ = session.read_line().await?;
        Ok(session)
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<(), AdapterError> {
        let (username, password) = require_telnet_creds(credentials)?;
        self.write_line(username).await?;
        self.write_line(password).await?;
        self.await_token(PROMPT_TOKEN).await
    }

    async fn send_and_await_ack(&mut self, command: &str) -> Result<String, AdapterError> {
        self.writer.write_all(command.as_bytes()).await.map_err(|_| AdapterError::Unreachable)?;
        self.await_line_containing(ACK_TOKEN).await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), AdapterError> {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|_| AdapterError::Unreachable)
    }

    async fn read_line(&mut self) -> Result<String, AdapterError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.map_err(|_| AdapterError::Unreachable)?;
        if n == 0 {
            return Err(AdapterError::Unreachable);
        }
        Ok(line)
    }

    async fn await_token(&mut self, token: &str) -> Result<(), AdapterError> {
        self.await_line_containing(token).await.map(|_| ())
    }

    /// Reads lines until one contains `token`, bounded only by the outer
    /// per-attempt deadline installed by `with_deadline` — a clean EOF before
    /// the token appears is itself an `UNREACHABLE` (peer hung up mid-session).
    async fn await_line_containing(&mut self, token: &str) -> Result<String, AdapterError> {
        loop {
            let line = self.read_line().await?;
            if line.contains(token) {
                return Ok(line);
            }
        }
    }
}

#[cfg(test)]
#[path = "telnet_tests.rs"]
mod tests;
