// SPDX-License-Identifier: MIT

use super::*;
use crate::error::ConfigError;

#[test]
fn telnet_projector_requires_telnet_credentials() {
    let device = Device::builder().device_type(DeviceType::TelnetProjector).build();
    assert_eq!(
        device.validate_required_fields(),
        Err(ConfigError::MissingCredentials {
            device: "d1".to_string(),
            device_type: "telnet_projector".to_string(),
        })
    );
}

#[test]
fn telnet_projector_with_credentials_is_valid() {
    let device = Device::builder()
        .device_type(DeviceType::TelnetProjector)
        .credentials(Credentials::Telnet { username: "admin".into(), password: "secret".into() })
        .build();
    assert!(device.validate_required_fields().is_ok());
}

#[test]
fn pc_wake_requires_mac() {
    let device = Device::builder().device_type(DeviceType::PcWake).build();
    assert!(device.validate_required_fields().is_err());

    let device = Device::builder()
        .device_type(DeviceType::PcWake)
        .credentials(Credentials::Wake { mac: "00:11:22:33:44:55".into(), management_host: None, management_port: None })
        .build();
    assert!(device.validate_required_fields().is_ok());
}

#[test]
fn generic_tcp_and_jsonrpc_have_no_mandatory_credentials() {
    let device = Device::builder().device_type(DeviceType::GenericTcp).build();
    assert!(device.validate_required_fields().is_ok());

    let device = Device::builder().device_type(DeviceType::JsonrpcProjector).build();
    assert!(device.validate_required_fields().is_ok());
}

#[test]
fn device_type_display_matches_config_tag() {
    assert_eq!(DeviceType::TelnetProjector.to_string(), "telnet_projector");
    assert_eq!(DeviceType::JsonrpcProjector.to_string(), "jsonrpc_projector");
    assert_eq!(DeviceType::PcWake.to_string(), "pc_wake");
    assert_eq!(DeviceType::GenericTcp.to_string(), "generic_tcp");
}
