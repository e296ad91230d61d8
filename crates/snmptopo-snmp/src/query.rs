//! Single-attribute device queries over SNMP

use anyhow::Result;
use async_trait::async_trait;
use snmp::{pdu, SnmpMessageType, SnmpPdu, Value};
use snmptopo_core::Address;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::error::{ErrorStatus, SnmpError};
use crate::transport::UdpTransportAsync;

/// Standard SNMP agent port
pub const SNMP_PORT: u16 = 161;

/// Default per-query timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Well-known system group facts polled for each device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// SNMPv2-MIB::sysName.0
    SysName,
    /// SNMPv2-MIB::sysDescr.0
    SysDescr,
}

impl Attribute {
    pub fn oid(&self) -> &'static str {
        match self {
            Self::SysName => "1.3.6.1.2.1.1.5.0",
            Self::SysDescr => "1.3.6.1.2.1.1.1.0",
        }
    }

    /// OID as sub-identifiers, for the request encoder
    pub fn oid_parts(&self) -> &'static [u32] {
        match self {
            Self::SysName => &[1, 3, 6, 1, 2, 1, 1, 5, 0],
            Self::SysDescr => &[1, 3, 6, 1, 2, 1, 1, 1, 0],
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SysName => f.write_str("sysName"),
            Self::SysDescr => f.write_str("sysDescr"),
        }
    }
}

/// Outcome of one query; failures are values, not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// First bound value of a successful reply
    Value(String),
    /// No reply within the timeout, or the exchange itself failed
    TransportFailure(String),
    /// Reply carried an error status; `index` is the offending varbind (1-based, 0 if none)
    ProtocolFailure { status: ErrorStatus, index: u32 },
}

impl QueryResult {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    fn malformed() -> Self {
        Self::ProtocolFailure {
            status: ErrorStatus::Malformed,
            index: 0,
        }
    }

    /// Map a decoded response to a result, using only the first varbind
    pub(crate) fn from_pdu(mut response: SnmpPdu<'_>) -> Self {
        if response.error_status != 0 {
            return Self::ProtocolFailure {
                status: ErrorStatus::from_code(response.error_status),
                index: response.error_index,
            };
        }

        match response.varbinds.next() {
            Some((_, value)) => Self::from_value(value),
            None => Self::malformed(),
        }
    }

    fn from_value(value: Value<'_>) -> Self {
        let exception = |status| Self::ProtocolFailure { status, index: 1 };
        let text = match value {
            Value::NoSuchObject => return exception(ErrorStatus::NoSuchObject),
            Value::NoSuchInstance => return exception(ErrorStatus::NoSuchInstance),
            Value::EndOfMibView => return exception(ErrorStatus::EndOfMibView),
            Value::OctetString(bytes) | Value::Opaque(bytes) => {
                String::from_utf8_lossy(bytes).into_owned()
            }
            Value::Integer(n) => n.to_string(),
            Value::Counter32(n) | Value::Unsigned32(n) | Value::Timeticks(n) => n.to_string(),
            Value::Counter64(n) => n.to_string(),
            Value::IpAddress(octets) => Ipv4Addr::from(octets).to_string(),
            Value::Null => String::new(),
            _ => return Self::malformed(),
        };
        Self::Value(text)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::TransportFailure(reason) => write!(f, "transport failure: {}", reason),
            Self::ProtocolFailure { status, index } => {
                write!(f, "protocol failure: {} (index {})", status, index)
            }
        }
    }
}

/// Whether a datagram from the agent ends the wait for `request_id`.
///
/// Undecodable datagrams are taken so they surface as malformed replies;
/// decodable ones must be the response to this request.
fn answers_request(reply: &[u8], request_id: i32) -> bool {
    match SnmpPdu::from_bytes(reply) {
        Ok(response) => {
            matches!(response.message_type, SnmpMessageType::Response)
                && response.req_id == request_id
        }
        Err(_) => true,
    }
}

/// Issues one logical query per call; no batching, no retries
#[async_trait]
pub trait PollingClient: Send + Sync {
    async fn query(&self, address: &Address, attribute: Attribute) -> QueryResult;
}

/// SNMPv2c GET client
#[derive(Debug, Clone)]
pub struct SnmpClient {
    port: u16,
    timeout: Duration,
}

impl Default for SnmpClient {
    fn default() -> Self {
        Self::new(SNMP_PORT, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl SnmpClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, address: &Address, attribute: Attribute) -> Result<QueryResult> {
        let request_id: i32 = rand::random_range(1..i32::MAX);
        let mut packet = pdu::Buf::default();
        pdu::build_get(
            address.community.as_bytes(),
            request_id,
            attribute.oid_parts(),
            &mut packet,
        );

        let mut transport = UdpTransportAsync::new(&address.host, self.port, self.timeout).await?;
        let reply = transport
            .transceive(&packet[..], |reply| answers_request(reply, request_id))
            .await?;

        match SnmpPdu::from_bytes(&reply) {
            Ok(response) => Ok(QueryResult::from_pdu(response)),
            Err(e) => {
                debug!(
                    host = %address.host,
                    oid = attribute.oid(),
                    error = %SnmpError::from(e),
                    "Undecodable SNMP response"
                );
                Ok(QueryResult::malformed())
            }
        }
    }
}

#[async_trait]
impl PollingClient for SnmpClient {
    async fn query(&self, address: &Address, attribute: Attribute) -> QueryResult {
        debug!(host = %address.host, attribute = %attribute, "Querying device");

        match self.get(address, attribute).await {
            Ok(result) => result,
            Err(e) => QueryResult::TransportFailure(e.to_string()),
        }
    }
}
