//! snmptopo SNMP - Polling client for device identity queries
//!
//! This crate issues single-OID SNMPv2c GET requests over UDP and reports
//! each outcome as a [`QueryResult`] instead of an error, so callers can
//! degrade per device without aborting a run.

pub mod error;
pub mod query;
pub mod transport;

pub use error::{ErrorStatus, SnmpError};
pub use query::{
    Attribute, PollingClient, QueryResult, SnmpClient, DEFAULT_TIMEOUT_MS, SNMP_PORT,
};
pub use transport::UdpTransportAsync;
