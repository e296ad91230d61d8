//! Bounded concurrent polling of device identity attributes

use snmptopo_core::{classify, Address, Device};
use snmptopo_snmp::{Attribute, PollingClient, QueryResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Query outcomes for one device, tagged with its input position
#[derive(Debug, Clone)]
pub struct DevicePoll {
    /// 0-based index in the input address list
    pub position: usize,
    pub address: Address,
    pub name: QueryResult,
    /// `None` when only sysName was queried
    pub description: Option<QueryResult>,
}

impl DevicePoll {
    fn aborted(position: usize, address: Address, query_description: bool) -> Self {
        let failure = QueryResult::TransportFailure("poll task aborted".to_string());
        Self {
            position,
            address,
            name: failure.clone(),
            description: query_description.then_some(failure),
        }
    }

    /// Build the device record; failed queries degrade to fallback name / `Unknown`
    pub fn into_device(self) -> Device {
        let name = Device::display_name(self.position, &self.address.host, self.name.value());

        let description = self.description.and_then(QueryResult::into_value);
        let device_type = classify(description.as_deref());

        Device::new(name, self.address, device_type)
    }
}

/// Poll every address, at most `max_in_flight` devices at a time.
///
/// Results come back in input order regardless of completion order, and
/// every address yields a `DevicePoll` even if its task panicked.
pub async fn poll_devices<C>(
    client: Arc<C>,
    addresses: &[Address],
    max_in_flight: usize,
    query_description: bool,
) -> Vec<DevicePoll>
where
    C: PollingClient + ?Sized + 'static,
{
    let permits = max_in_flight.clamp(1, Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut tasks = JoinSet::new();

    for (position, address) in addresses.iter().cloned().enumerate() {
        let client = client.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            poll_device(client.as_ref(), position, address, query_description).await
        });
    }

    let mut slots: Vec<Option<DevicePoll>> = (0..addresses.len()).map(|_| None).collect();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(poll) => {
                let position = poll.position;
                slots[position] = Some(poll);
            }
            Err(e) => warn!(error = %e, "Device poll task failed"),
        }
    }

    slots
        .into_iter()
        .zip(addresses)
        .enumerate()
        .map(|(position, (slot, address))| {
            slot.unwrap_or_else(|| {
                DevicePoll::aborted(position, address.clone(), query_description)
            })
        })
        .collect()
}

/// Query one device's sysName (and sysDescr) concurrently
async fn poll_device<C>(
    client: &C,
    position: usize,
    address: Address,
    query_description: bool,
) -> DevicePoll
where
    C: PollingClient + ?Sized,
{
    let (name, description) = if query_description {
        let (name, description) = tokio::join!(
            client.query(&address, Attribute::SysName),
            client.query(&address, Attribute::SysDescr),
        );
        (name, Some(description))
    } else {
        (client.query(&address, Attribute::SysName).await, None)
    };

    log_failure(&address, Attribute::SysName, &name);
    if let Some(description) = &description {
        log_failure(&address, Attribute::SysDescr, description);
    }

    debug!(host = %address.host, position = position, "Device polled");

    DevicePoll {
        position,
        address,
        name,
        description,
    }
}

fn log_failure(address: &Address, attribute: Attribute, result: &QueryResult) {
    if result.is_failure() {
        warn!(
            host = %address.host,
            attribute = %attribute,
            oid = attribute.oid(),
            error = %result,
            "Query failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snmptopo_core::DeviceType;
    use snmptopo_snmp::ErrorStatus;
    use std::collections::BTreeMap;

    fn address(last: u8) -> Address {
        Address::new(format!("10.0.0.{}", last), "public")
    }

    fn attributes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct EchoHost;

    #[async_trait]
    impl PollingClient for EchoHost {
        async fn query(&self, address: &Address, attribute: Attribute) -> QueryResult {
            QueryResult::Value(format!("{} {}", attribute, address.host))
        }
    }

    #[test]
    fn test_into_device_success() {
        let poll = DevicePoll {
            position: 0,
            address: address(1),
            name: QueryResult::Value("core-sw".to_string()),
            description: Some(QueryResult::Value("Cisco IOS Switch".to_string())),
        };
        let device = poll.into_device();
        assert_eq!(device.name, "core-sw (10.0.0.1)");
        assert_eq!(device.device_type, DeviceType::Switch);
        assert_eq!(
            device.attributes,
            attributes(&[("type", "switch"), ("ip", "10.0.0.1")])
        );
    }

    #[test]
    fn test_into_device_total_failure() {
        let poll = DevicePoll {
            position: 2,
            address: address(3),
            name: QueryResult::TransportFailure("timeout".to_string()),
            description: Some(QueryResult::ProtocolFailure {
                status: ErrorStatus::NoSuchName,
                index: 1,
            }),
        };
        let device = poll.into_device();
        assert_eq!(device.name, "Device-3 (10.0.0.3)");
        assert_eq!(device.device_type, DeviceType::Unknown);
        assert_eq!(
            device.attributes,
            attributes(&[("type", "unknown"), ("ip", "10.0.0.3")])
        );
    }

    #[test]
    fn test_into_device_hostname() {
        let poll = DevicePoll {
            position: 1,
            address: Address::new("edge.lab", "public"),
            name: QueryResult::TransportFailure("Could not resolve edge.lab".to_string()),
            description: Some(QueryResult::TransportFailure("Could not resolve edge.lab".to_string())),
        };
        let device = poll.into_device();
        assert_eq!(device.name, "Device-2 (edge.lab)");
        assert_eq!(device.attribute("ip"), Some("edge.lab"));
    }

    #[tokio::test]
    async fn test_oversized_bound_does_not_panic() {
        let polls = poll_devices(Arc::new(EchoHost), &[address(1), address(2)], usize::MAX, false).await;
        assert_eq!(polls.len(), 2);
        assert_eq!(polls[1].name.value(), Some("sysName 10.0.0.2"));
    }

    #[test]
    fn test_into_device_name_only() {
        let poll = DevicePoll {
            position: 0,
            address: address(1),
            name: QueryResult::Value("linux-box".to_string()),
            description: None,
        };
        // Without sysDescr the name is never used for classification
        assert_eq!(poll.into_device().device_type, DeviceType::Unknown);
    }
}
