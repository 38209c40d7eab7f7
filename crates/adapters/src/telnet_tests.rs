// SPDX-License-Identifier: MIT

use super::*;
use aquactl_core::{Credentials, Device, DeviceType};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

async fn spawn_fake_projector(ack_power: bool) -> (String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        write_half.write_all(b"Welcome to Vendor Projector\r\n").await.ok();
        let mut line = String::new();
        reader.read_line(&mut line).await.ok(); // username
        line.clear();
        reader.read_line(&mut line).await.ok(); // password
        write_half.write_all(b"> ready\r\n").await.ok();
        let mut cmd = [0u8; 32];
        let n = tokio::io::AsyncReadExt::read(&mut reader, &mut cmd).await.unwrap_or(0);
        let _ = &cmd[..n];
        if ack_power {
            write_half.write_all(b"OK\r\n").await.ok();
        } else {
            write_half.write_all(b"ERR\r\n").await.ok();
        }
    });
    (addr.ip().to_string(), addr.port())
}

fn device_with(host: String, port: u16) -> Device {
    Device::builder()
        .device_type(DeviceType::TelnetProjector)
        .host(host)
        .port(port)
        .credentials(Credentials::Telnet { username: "admin".into(), password: "secret".into() })
        .build()
}

#[tokio::test]
async fn power_on_succeeds_when_device_acks() {
    let (host, port) = spawn_fake_projector(true).await;
    let device = device_with(host, port);
    let result = TelnetProjectorAdapter
        .power_on(&device, Duration::from_secs(2), &CancellationToken::new())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn power_on_fails_with_protocol_error_when_device_rejects() {
    let (host, port) = spawn_fake_projector(false).await;
    let device = device_with(host, port);
    let err = TelnetProjectorAdapter
        .power_on(&device, Duration::from_secs(2), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Protocol);
}

#[tokio::test]
async fn connection_refused_maps_to_unreachable() {
    // Nothing listening on this ephemeral, unbound port.
    let device = device_with("127.0.0.1".to_string(), 1);
    let err = TelnetProjectorAdapter
        .power_on(&device, Duration::from_secs(1), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Unreachable);
}

#[tokio::test]
async fn missing_credentials_is_a_protocol_error() {
    let device = Device::builder().device_type(DeviceType::TelnetProjector).host("127.0.0.1".into()).port(1).build();
    let err = TelnetProjectorAdapter
        .power_on(&device, Duration::from_secs(1), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Protocol);
}
