// SPDX-License-Identifier: MIT

//! What a scheduled job or bulk API call should act on.
//!
//! Serializes to/from a tagged string: `"device:<id>"`, `"group:<id>"`, `"all"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceTarget {
    Device(String),
    Group(String),
    All,
}

impl DeviceTarget {
    pub fn device(id: impl Into<String>) -> Self {
        DeviceTarget::Device(id.into())
    }

    pub fn group(id: impl Into<String>) -> Self {
        DeviceTarget::Group(id.into())
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Device(id) => write!(f, "device:{id}"),
            DeviceTarget::Group(id) => write!(f, "group:{id}"),
            DeviceTarget::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("target must be 'device:<id>', 'group:<id>', or 'all', got {0:?}")]
pub struct ParseTargetError(pub String);

impl FromStr for DeviceTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(DeviceTarget::All)
        } else if let Some(id) = s.strip_prefix("device:") {
            if id.is_empty() {
                return Err(ParseTargetError(s.to_string()));
            }
            Ok(DeviceTarget::Device(id.to_string()))
        } else if let Some(id) = s.strip_prefix("group:") {
            if id.is_empty() {
                return Err(ParseTargetError(s.to_string()));
            }
            Ok(DeviceTarget::Group(id.to_string()))
        } else {
            Err(ParseTargetError(s.to_string()))
        }
    }
}

impl Serialize for DeviceTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DeviceTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
