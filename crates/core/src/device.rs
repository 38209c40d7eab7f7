// SPDX-License-Identifier: MIT

//! Device identity, type, credentials, and probe specification.
//!
//! A `Device` is immutable once loaded by the registry; nothing downstream
//! mutates it in place, so a discovered device is always `Clone`d out of the
//! snapshot rather than borrowed mutably.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique device identifier, as given in the configuration document.
///
/// Unlike the generated IDs in [`crate::scheduled_job`], device ids are
/// user-supplied and stable across restarts, so they are plain strings
/// rather than a `define_id!` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The protocol family a device speaks. Adapter selection is keyed off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    TelnetProjector,
    JsonrpcProjector,
    PcWake,
    GenericTcp,
}

crate::simple_display! {
    DeviceType {
        TelnetProjector => "telnet_projector",
        JsonrpcProjector => "jsonrpc_projector",
        PcWake => "pc_wake",
        GenericTcp => "generic_tcp",
    }
}

/// Per-type credentials. Which variant is populated is dictated by `DeviceType`;
/// the registry validates the pairing at load time (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    Telnet { username: String, password: String },
    Wake { mac: String, management_host: Option<String>, management_port: Option<u16> },
    None,
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials::None
    }
}

/// How the Health Prober should test reachability for this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProbeSpec {
    Icmp,
    TcpConnect { port: u16 },
    Http { path: String },
}

impl Default for ProbeSpec {
    fn default() -> Self {
        ProbeSpec::TcpConnect { port: 0 }
    }
}

/// An immutable, network-addressable piece of equipment the engine can
/// power-control or probe. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub group_ids: BTreeSet<String>,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub probe_spec: ProbeSpec,
}

impl Device {
    /// Checks that this device carries the fields its type requires (§4.1).
    /// Returns the missing-fields error kind on failure; callers decide
    /// whether that's fatal (startup) or per-request.
    pub fn validate_required_fields(&self) -> Result<(), crate::error::ConfigError> {
        match (&self.device_type, &self.credentials) {
            (DeviceType::TelnetProjector, Credentials::Telnet { .. }) => Ok(()),
            (DeviceType::TelnetProjector, _) => Err(crate::error::ConfigError::MissingCredentials {
                device: self.id.to_string(),
                device_type: self.device_type.to_string(),
            }),
            (DeviceType::PcWake, Credentials::Wake { .. }) => Ok(()),
            (DeviceType::PcWake, _) => Err(crate::error::ConfigError::MissingCredentials {
                device: self.id.to_string(),
                device_type: self.device_type.to_string(),
            }),
            // jsonrpc_projector and generic_tcp carry no mandatory credentials.
            (DeviceType::JsonrpcProjector, _) | (DeviceType::GenericTcp, _) => Ok(()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct DeviceBuilder => Device {
        into {
            id: DeviceId = "d1",
            name: String = "Device 1",
            host: String = "127.0.0.1",
        }
        set {
            device_type: DeviceType = DeviceType::GenericTcp,
            port: u16 = 9000,
            group_ids: std::collections::BTreeSet<String> = std::collections::BTreeSet::new(),
            credentials: Credentials = Credentials::None,
            probe_spec: ProbeSpec = ProbeSpec::TcpConnect { port: 9000 },
        }
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
