//! Immutable topology snapshot handed to renderers and exporters

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::device::{Device, DeviceType};
use crate::topology::{Link, LinkStrategy};

/// Frozen (nodes, edges) graph of one discovery run.
///
/// Renderers key their styling off the `type` attribute present on every
/// node and every edge.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub generated_at: DateTime<Utc>,
    /// Strategy that produced `edges`, if any ran
    pub strategy: Option<LinkStrategy>,
    nodes: BTreeMap<String, Device>,
    edges: Vec<Link>,
}

impl TopologySnapshot {
    pub(crate) fn new(
        nodes: BTreeMap<String, Device>,
        edges: Vec<Link>,
        strategy: Option<LinkStrategy>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            strategy,
            nodes,
            edges,
        }
    }

    /// Nodes keyed by display name
    pub fn nodes(&self) -> &BTreeMap<String, Device> {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Device> {
        self.nodes.get(name)
    }

    /// Edges in the order they were generated
    pub fn edges(&self) -> &[Link] {
        &self.edges
    }

    /// Number of nodes of each device type
    pub fn type_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for device in self.nodes.values() {
            *counts.entry(device.device_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_of(&self, device_type: DeviceType) -> usize {
        self.nodes
            .values()
            .filter(|d| d.device_type == device_type)
            .count()
    }

    /// Nodes with no incident edge
    pub fn isolated_nodes(&self) -> Vec<&str> {
        self.nodes
            .keys()
            .filter(|name| {
                !self
                    .edges
                    .iter()
                    .any(|e| &e.source == *name || &e.target == *name)
            })
            .map(String::as_str)
            .collect()
    }

    /// Serialize to JSON
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Write JSON to a file
    pub fn write_json(&self, path: &Path, pretty: bool) -> std::io::Result<()> {
        let content = self.to_json(pretty).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }
}
