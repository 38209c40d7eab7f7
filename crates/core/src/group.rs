// SPDX-License-Identifier: MIT

//! Named device groups.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for GroupId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A named set of devices acted upon as a unit.
///
/// `device_ids` is deserialized as the plain ordered sequence the
/// configuration document actually contains — a `Vec`, not a set — so a
/// duplicate member id survives deserialization intact instead of being
/// silently folded away. `Registry::load` is what rejects duplicates (§3,
/// §4.1); this type only carries what was configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub device_ids: Vec<String>,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct GroupBuilder => Group {
        into {
            id: GroupId = "g1",
            name: String = "Group 1",
        }
        set {
            device_ids: Vec<String> = Vec::new(),
        }
    }
}
