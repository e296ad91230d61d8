//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use snmptopo_core::LinkStrategy;
use snmptopo_discovery::config::DEFAULT_MAX_IN_FLIGHT;
use snmptopo_discovery::DiscoveryConfig;
use snmptopo_snmp::{SnmpClient, DEFAULT_TIMEOUT_MS, SNMP_PORT};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub snmp: SnmpConfig,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpConfig {
    /// Agent UDP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-query timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Community string
    #[serde(default = "default_community")]
    pub community: String,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            community: default_community(),
        }
    }
}

fn default_port() -> u16 {
    SNMP_PORT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_community() -> String {
    "public".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Devices polled at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Query sysDescr to classify devices
    #[serde(default = "default_true")]
    pub query_description: bool,
    /// "chain" or "fan-out"
    #[serde(default)]
    pub strategy: LinkStrategy,
    /// Fixed seed for the fan-out strategy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            query_description: true,
            strategy: LinkStrategy::default(),
            seed: None,
        }
    }
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Snapshot JSON destination; stdout when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: true,
        }
    }
}

impl Config {
    /// Convert to the orchestrator's configuration
    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_in_flight: self.discovery.max_in_flight,
            query_description: self.discovery.query_description,
            strategy: self.discovery.strategy,
            seed: self.discovery.seed,
        }
    }

    pub fn client(&self) -> SnmpClient {
        SnmpClient::new(self.snmp.port, Duration::from_millis(self.snmp.timeout_ms))
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
