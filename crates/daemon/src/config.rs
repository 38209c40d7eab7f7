// SPDX-License-Identifier: MIT

//! Configuration document loading (§6).
//!
//! The document is a single TOML file. Device and group shapes are the same
//! types the rest of the engine uses (`aquactl_core::Device`/`Group`), so
//! there is nothing to translate between "config DTO" and "domain type" —
//! the struct that `serde` deserializes into *is* the domain type.

use aquactl_core::{ConfigError, Device, Group, RetryPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_monitor_interval_sec() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    10
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// The raw shape of the configuration document, one-to-one with §6's key
/// table.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_monitor_interval_sec")]
    pub monitor_interval_sec: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    pub schedule_db_path: PathBuf,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// A loaded, validated configuration: the raw document plus the resolved
/// timezone (parsing `timezone` eagerly means a bad IANA name is a startup
/// failure, not a runtime surprise the first time a job tries to fire).
pub struct DaemonConfig {
    pub document: ConfigDocument,
    pub timezone: chrono_tz::Tz,
    pub source_path: PathBuf,
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.display().to_string(), source: std::sync::Arc::new(e) })?;
        Self::parse(&text, path.to_path_buf())
    }

    fn parse(text: &str, source_path: PathBuf) -> Result<Self, ConfigError> {
        let document: ConfigDocument = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let timezone: chrono_tz::Tz = document.timezone.parse().map_err(|_| ConfigError::UnknownTimezone(document.timezone.clone()))?;
        Ok(Self { document, timezone, source_path })
    }

    /// Default location: `$AQUACTL_CONFIG`, else `$XDG_CONFIG_HOME/aquactl/config.toml`,
    /// else `~/.config/aquactl/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("AQUACTL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("aquactl").join("config.toml")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
