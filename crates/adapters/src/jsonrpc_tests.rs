// SPDX-License-Identifier: MIT

use super::*;
use aquactl_core::{Device, DeviceType};
use tokio::net::TcpListener;

async fn spawn_fake_projector(reply: Value) -> (String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.ok();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await.ok();
        let request: Value = serde_json::from_slice(&body).unwrap();
        let mut response = reply.clone();
        response["id"] = request["id"].clone();
        write_frame(&mut stream, &response).await.ok();
    });
    (addr.ip().to_string(), addr.port())
}

fn device_with(host: String, port: u16) -> Device {
    Device::builder().device_type(DeviceType::JsonrpcProjector).host(host).port(port).build()
}

#[tokio::test]
async fn power_on_succeeds_when_the_result_echoes_the_requested_state() {
    let (host, port) = spawn_fake_projector(json!({ "jsonrpc": "2.0", "id": 0, "result": { "state": "on" } })).await;
    let device = device_with(host, port);
    let result = JsonRpcProjectorAdapter.power_on(&device, Duration::from_secs(2), &CancellationToken::new()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn power_on_fails_on_a_non_error_result_that_does_not_confirm_the_state() {
    let (host, port) = spawn_fake_projector(json!({ "jsonrpc": "2.0", "id": 0, "result": { "ok": true } })).await;
    let device = device_with(host, port);
    let err = JsonRpcProjectorAdapter
        .power_on(&device, Duration::from_secs(2), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Protocol);
}

#[tokio::test]
async fn power_on_fails_when_the_result_echoes_the_wrong_state() {
    let (host, port) = spawn_fake_projector(json!({ "jsonrpc": "2.0", "id": 0, "result": { "state": "off" } })).await;
    let device = device_with(host, port);
    let err = JsonRpcProjectorAdapter
        .power_on(&device, Duration::from_secs(2), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Protocol);
}

#[tokio::test]
async fn power_on_fails_when_response_carries_an_error() {
    let (host, port) = spawn_fake_projector(json!({ "jsonrpc": "2.0", "id": 0, "error": { "code": -1, "message": "nope" } })).await;
    let device = device_with(host, port);
    let err = JsonRpcProjectorAdapter
        .power_on(&device, Duration::from_secs(2), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Protocol);
}

#[tokio::test]
async fn query_power_reports_on_state() {
    let (host, port) = spawn_fake_projector(json!({ "jsonrpc": "2.0", "id": 0, "result": { "state": "on" } })).await;
    let device = device_with(host, port);
    let state = JsonRpcProjectorAdapter.query_power(&device, Duration::from_secs(2), &CancellationToken::new()).await.unwrap();
    assert_eq!(state, PowerState::On);
}

#[tokio::test]
async fn connection_refused_maps_to_unreachable() {
    let device = device_with("127.0.0.1".to_string(), 1);
    let err = JsonRpcProjectorAdapter
        .power_on(&device, Duration::from_secs(1), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Unreachable);
}
