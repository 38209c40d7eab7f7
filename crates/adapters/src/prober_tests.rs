// SPDX-License-Identifier: MIT

use super::*;
use aquactl_core::{Device, DeviceType};
use tokio::net::TcpListener;

#[tokio::test]
async fn tcp_connect_probe_reports_reachable_when_port_is_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });
    let device = Device::builder()
        .device_type(DeviceType::GenericTcp)
        .host(addr.ip().to_string())
        .port(addr.port())
        .probe_spec(ProbeSpec::TcpConnect { port: addr.port() })
        .build();
    let result = probe(&device).await;
    assert!(result.reachable);
}

#[tokio::test]
async fn tcp_connect_probe_reports_unreachable_when_port_is_closed() {
    let device = Device::builder()
        .device_type(DeviceType::GenericTcp)
        .host("127.0.0.1".into())
        .port(1)
        .probe_spec(ProbeSpec::TcpConnect { port: 1 })
        .build();
    let result = probe(&device).await;
    assert!(!result.reachable);
}

#[tokio::test]
async fn icmp_probe_falls_back_to_tcp_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });
    let device = Device::builder()
        .device_type(DeviceType::GenericTcp)
        .host(addr.ip().to_string())
        .port(addr.port())
        .probe_spec(ProbeSpec::Icmp)
        .build();
    let result = probe(&device).await;
    assert!(result.reachable);
}
