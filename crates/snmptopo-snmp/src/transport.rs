//! Async UDP transport for SNMP request/response exchanges

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::trace;

use crate::error::SnmpError;

/// Largest datagram accepted from an agent
const MAX_DATAGRAM: usize = 65_507;

/// Async UDP transport bound to one agent
pub struct UdpTransportAsync {
    socket: UdpSocket,
    target: SocketAddr,
    timeout: Duration,
}

impl UdpTransportAsync {
    /// Resolve `host` and bind an ephemeral local socket of its address family.
    ///
    /// Resolution counts against the same timeout as the exchange.
    pub async fn new(host: &str, port: u16, timeout_after: Duration) -> Result<Self> {
        let target = match timeout(timeout_after, lookup_host((host, port))).await {
            Ok(Ok(mut addrs)) => addrs
                .next()
                .ok_or_else(|| SnmpError::Resolve(host.to_string()))?,
            Ok(Err(e)) => return Err(SnmpError::Resolve(format!("{}: {}", host, e)).into()),
            Err(_) => return Err(SnmpError::Resolve(format!("{}: timed out", host)).into()),
        };

        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;

        Ok(Self {
            socket,
            target,
            timeout: timeout_after,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send one datagram and wait for a reply `accept` takes, bounded by the timeout.
    ///
    /// Datagrams from any other endpoint, and replies `accept` rejects, are
    /// dropped and the wait continues.
    pub async fn transceive<F>(&mut self, packet: &[u8], mut accept: F) -> Result<Vec<u8>>
    where
        F: FnMut(&[u8]) -> bool,
    {
        trace!(target = %self.target, len = packet.len(), "Sending SNMP request");

        self.socket.send_to(packet, self.target).await?;
        let deadline = Instant::now() + self.timeout;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => anyhow::bail!("No response within {} ms", self.timeout.as_millis()),
            };

            if from.ip() != self.target.ip() || from.port() != self.target.port() {
                trace!(from = %from, "Dropping datagram from unexpected peer");
                continue;
            }
            if !accept(&buf[..len]) {
                trace!(from = %from, len = len, "Dropping unmatched reply");
                continue;
            }

            trace!(from = %from, len = len, "Received SNMP response");
            buf.truncate(len);
            return Ok(buf);
        }
    }
}
