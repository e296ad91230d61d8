//! snmptopo Discovery - Polling orchestration and topology assembly
//!
//! This crate drives the polling client across an address list:
//! - Bounded concurrent sysName/sysDescr queries per device
//! - Input-order join with positional fallback names
//! - Classification and link generation into a topology snapshot

pub mod config;
pub mod probe;
pub mod scanner;

pub use config::{parse_addresses, ConfigurationError, DiscoveryConfig};
pub use probe::{poll_devices, DevicePoll};
pub use scanner::{DiscoveryError, DiscoveryScanner};
