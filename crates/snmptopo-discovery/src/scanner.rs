//! Discovery orchestrator: poll, classify, and assemble the topology

use rand::rngs::StdRng;
use rand::SeedableRng;
use snmptopo_core::{Address, Device, TopologyBuilder, TopologyError, TopologySnapshot};
use snmptopo_snmp::PollingClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{validate_addresses, ConfigurationError, DiscoveryConfig};
use crate::probe::poll_devices;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Topology assembly failed: {0}")]
    Topology(#[from] TopologyError),
}

/// Discovery orchestrator over a polling client
pub struct DiscoveryScanner<C: ?Sized> {
    client: Arc<C>,
    config: DiscoveryConfig,
}

impl<C> DiscoveryScanner<C>
where
    C: PollingClient + ?Sized + 'static,
{
    /// Create a new scanner with the given client and configuration
    pub fn new(client: Arc<C>, config: DiscoveryConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Poll every address and build one device record per address, in input order.
    ///
    /// Query failures never fail the run; only invalid input does, and it is
    /// rejected before anything is sent.
    pub async fn discover(&self, addresses: &[Address]) -> Result<Vec<Device>, ConfigurationError> {
        self.config.validate()?;
        validate_addresses(addresses)?;

        info!(
            devices = addresses.len(),
            max_in_flight = self.config.max_in_flight,
            query_description = self.config.query_description,
            "Starting discovery"
        );

        let polls = poll_devices(
            self.client.clone(),
            addresses,
            self.config.max_in_flight,
            self.config.query_description,
        )
        .await;

        let named = polls.iter().filter(|p| !p.name.is_failure()).count();
        let devices: Vec<Device> = polls.into_iter().map(|p| p.into_device()).collect();

        for device in &devices {
            debug!(device = %device.name, device_type = %device.device_type, "Device recorded");
        }

        info!(
            "Discovery complete: {} devices, {} answered sysName",
            devices.len(),
            named
        );

        Ok(devices)
    }

    /// Run a full discovery and produce the topology snapshot
    pub async fn scan_once(&self, addresses: &[Address]) -> Result<TopologySnapshot, DiscoveryError> {
        let devices = self.discover(addresses).await?;
        Ok(self.assemble(devices)?)
    }

    /// Build the topology from a complete device set using the configured strategy
    pub fn assemble(&self, devices: Vec<Device>) -> Result<TopologySnapshot, TopologyError> {
        let mut builder = TopologyBuilder::new();
        for device in devices {
            builder.add_device(device)?;
        }

        let mut rng = self.rng();
        let links = builder.apply(self.config.strategy, &mut rng)?;

        info!(
            strategy = %self.config.strategy,
            nodes = builder.len(),
            links = links,
            "Topology assembled"
        );

        Ok(builder.build())
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
