// SPDX-License-Identifier: MIT

//! Device Registry (§4.1): the in-memory, validated catalogue of devices and
//! groups every other component resolves targets against.
//!
//! Construction is the only place validation happens — once a `Registry`
//! exists, every device and group in it is known-good, and lookups never
//! fail with a config error, only a not-found one.

use aquactl_core::{ConfigError, Device, DeviceId, DeviceTarget, Group, GroupId, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;

/// A fully validated, immutable snapshot of the configured fleet.
///
/// Cheap to clone — internally `Arc`-shared — so a SIGHUP reload can publish
/// a brand new `Registry` to readers without anyone holding a lock on the
/// hot path (§4.1, §5).
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    devices: HashMap<DeviceId, Device>,
    groups: HashMap<GroupId, Group>,
    /// Stable iteration order for `all()`, matching configuration order.
    device_order: Vec<DeviceId>,
}

impl Registry {
    /// Validates and loads a device/group set (§4.1):
    /// - device ids are unique
    /// - group ids are unique
    /// - every group member references a known device
    /// - every device carries the fields its type requires
    pub fn load(devices: Vec<Device>, groups: Vec<Group>) -> Result<Self, ConfigError> {
        let mut by_id = HashMap::with_capacity(devices.len());
        let mut order = Vec::with_capacity(devices.len());
        for device in devices {
            device.validate_required_fields()?;
            if by_id.contains_key(&device.id) {
                return Err(ConfigError::DuplicateDeviceId(device.id.to_string()));
            }
            order.push(device.id.clone());
            by_id.insert(device.id.clone(), device);
        }

        let mut groups_by_id = HashMap::with_capacity(groups.len());
        for group in groups {
            if groups_by_id.contains_key(&group.id) {
                return Err(ConfigError::DuplicateGroupId(group.id.to_string()));
            }
            let mut seen = std::collections::HashSet::with_capacity(group.device_ids.len());
            for member in &group.device_ids {
                if !by_id.contains_key(member.as_str()) {
                    return Err(ConfigError::UnknownGroupMember { group: group.id.to_string(), device: member.clone() });
                }
                if !seen.insert(member.as_str()) {
                    return Err(ConfigError::DuplicateGroupMember { group: group.id.to_string(), device: member.clone() });
                }
            }
            groups_by_id.insert(group.id.clone(), group);
        }

        Ok(Self { inner: Arc::new(Inner { devices: by_id, groups: groups_by_id, device_order: order }) })
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.inner.devices.get(id)
    }

    /// All devices, in configuration order.
    pub fn all(&self) -> Vec<&Device> {
        self.inner.device_order.iter().filter_map(|id| self.inner.devices.get(id)).collect()
    }

    /// All devices belonging to `group_id`, in the group's member order.
    pub fn group(&self, group_id: &str) -> Option<Vec<&Device>> {
        let group = self.inner.groups.get(group_id)?;
        Some(group.device_ids.iter().filter_map(|id| self.inner.devices.get(id.as_str())).collect())
    }

    pub fn groups(&self) -> Vec<&Group> {
        self.inner.groups.values().collect()
    }

    /// Resolves a scheduler/API target into the concrete device ids it covers.
    pub fn ids_matching(&self, target: &DeviceTarget) -> Result<Vec<DeviceId>, ValidationError> {
        match target {
            DeviceTarget::Device(id) => {
                if self.inner.devices.contains_key(id.as_str()) {
                    Ok(vec![DeviceId::from(id.as_str())])
                } else {
                    Err(ValidationError::UnknownDevice(id.clone()))
                }
            }
            DeviceTarget::Group(id) => match self.group(id) {
                Some(devices) => Ok(devices.into_iter().map(|d| d.id.clone()).collect()),
                None => Err(ValidationError::UnknownGroup(id.clone())),
            },
            DeviceTarget::All => Ok(self.inner.device_order.clone()),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
