//! Discovery configuration and input validation

use serde::{Deserialize, Serialize};
use snmptopo_core::{Address, LinkStrategy};
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Default bound on devices polled at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Largest accepted bound on devices polled at once
pub const MAX_IN_FLIGHT_LIMIT: usize = Semaphore::MAX_PERMITS;

/// Longest community string accepted
const MAX_COMMUNITY_LEN: usize = 255;

/// Longest hostname accepted (RFC 1035)
const MAX_HOSTNAME_LEN: usize = 253;

/// Invalid input, reported before any device is queried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Address list is empty")]
    EmptyAddressList,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Address listed more than once: {0}")]
    DuplicateAddress(String),
    #[error("Invalid community string: {0}")]
    InvalidCommunity(&'static str),
    #[error("max_in_flight must be at least 1")]
    ZeroConcurrency,
    #[error("max_in_flight {0} exceeds the limit of {limit}", limit = MAX_IN_FLIGHT_LIMIT)]
    ConcurrencyTooHigh(usize),
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum number of devices with queries in flight
    pub max_in_flight: usize,
    /// Also query sysDescr and classify devices
    pub query_description: bool,
    /// Link generation strategy
    pub strategy: LinkStrategy,
    /// Seed for the fan-out strategy's random source
    pub seed: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            query_description: true,
            strategy: LinkStrategy::Chain,
            seed: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_in_flight == 0 {
            return Err(ConfigurationError::ZeroConcurrency);
        }
        if self.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(ConfigurationError::ConcurrencyTooHigh(self.max_in_flight));
        }
        Ok(())
    }
}

/// Check a community string; the value itself is never echoed back
pub fn validate_community(community: &str) -> Result<(), ConfigurationError> {
    if community.is_empty() {
        return Err(ConfigurationError::InvalidCommunity("empty"));
    }
    if community.len() > MAX_COMMUNITY_LEN {
        return Err(ConfigurationError::InvalidCommunity("longer than 255 bytes"));
    }
    if !community.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ConfigurationError::InvalidCommunity(
            "must be printable ASCII without spaces",
        ));
    }
    Ok(())
}

/// Canonical form of an IP literal or hostname; `None` if it is neither.
///
/// Hostnames are only checked for shape here. Resolution happens per query,
/// so a name that does not resolve degrades that device instead of the run.
fn normalize_host(host: &str) -> Option<String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip.to_string());
    }

    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };

    let name = host.strip_suffix('.').unwrap_or(host);
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN || !name.split('.').all(valid_label) {
        return None;
    }
    // All-numeric dotted names are mistyped IPv4 addresses, not hosts
    if name.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

/// Parse IP addresses or hostnames into polling addresses sharing one community
pub fn parse_addresses<S: AsRef<str>>(
    hosts: &[S],
    community: &str,
) -> Result<Vec<Address>, ConfigurationError> {
    let addresses = hosts
        .iter()
        .map(|host| {
            let host = host.as_ref().trim();
            normalize_host(host)
                .map(|host| Address::new(host, community))
                .ok_or_else(|| ConfigurationError::InvalidAddress(host.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    validate_addresses(&addresses)?;
    Ok(addresses)
}

/// Non-empty, no repeated host, valid community on every entry
pub fn validate_addresses(addresses: &[Address]) -> Result<(), ConfigurationError> {
    if addresses.is_empty() {
        return Err(ConfigurationError::EmptyAddressList);
    }

    let mut seen = HashSet::new();
    for address in addresses {
        validate_community(&address.community)?;
        if address.host.is_empty() {
            return Err(ConfigurationError::InvalidAddress(String::new()));
        }
        if !seen.insert(address.host.as_str()) {
            return Err(ConfigurationError::DuplicateAddress(address.host.clone()));
        }
    }
    Ok(())
}
