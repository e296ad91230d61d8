//! Device types for tracking polled hardware

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node attribute holding the device type
pub const ATTR_TYPE: &str = "type";
/// Node attribute holding the polled endpoint, as given
pub const ATTR_IP: &str = "ip";

/// Endpoint to poll plus the community string used to authenticate.
///
/// `host` is an IP literal or a hostname; hostnames are resolved per query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: String,
    pub community: String,
}

impl Address {
    pub fn new(host: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            community: community.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// Coarse device category derived from the system description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Router,
    Switch,
    Server,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A polled device, keyed by its display name within one discovery run.
///
/// Only `attributes` is serialized: the display name is the key of the
/// snapshot's node map, and the community string never leaves the process.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// Display name, e.g. `core-sw (10.0.0.1)` or `Device-2 (10.0.0.2)`
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub address: Address,
    #[serde(skip)]
    pub device_type: DeviceType,
    /// Node attributes; always carries `type` and `ip`
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl Device {
    /// Create a device record with the mandatory `type` and `ip` attributes
    pub fn new(name: impl Into<String>, address: Address, device_type: DeviceType) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(ATTR_TYPE.to_string(), device_type.as_str().to_string());
        attributes.insert(ATTR_IP.to_string(), address.host.clone());
        Self {
            name: name.into(),
            address,
            device_type,
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Display name for a polled device.
    ///
    /// `position` is the 0-based index in the input list; the fallback name
    /// uses the 1-based position so numbering follows input order. A reported
    /// sysName is used verbatim; only an empty one falls back.
    pub fn display_name(position: usize, host: &str, sys_name: Option<&str>) -> String {
        match sys_name.filter(|n| !n.is_empty()) {
            Some(name) => format!("{} ({})", name, host),
            None => format!("Device-{} ({})", position + 1, host),
        }
    }
}
