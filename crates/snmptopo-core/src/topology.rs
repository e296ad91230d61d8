//! Topology builder: device set plus inferred links

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

use crate::device::Device;
use crate::snapshot::TopologySnapshot;

/// Upper bound on links drawn per device by the fan-out strategy
pub const MAX_FAN_OUT: usize = 3;

/// Link attribute holding the link type
pub const ATTR_LINK_TYPE: &str = "type";
/// Link attribute holding the nominal speed
pub const ATTR_LINK_SPEED: &str = "speed";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TopologyError {
    #[error("No devices to link")]
    EmptyDeviceSet,
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
    #[error("Duplicate device name: {0}")]
    DuplicateDevice(String),
    #[error("Unknown link strategy: {0} (expected \"chain\" or \"fan-out\")")]
    UnknownStrategy(String),
}

/// An undirected link between two devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl Link {
    /// Gigabit ethernet link, the only kind either strategy infers
    pub fn ethernet(source: impl Into<String>, target: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(ATTR_LINK_TYPE.to_string(), "ethernet".to_string());
        attributes.insert(ATTR_LINK_SPEED.to_string(), "1Gbps".to_string());
        Self {
            source: source.into(),
            target: target.into(),
            attributes,
        }
    }

    /// Whether this link joins `a` and `b`, in either direction
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// How links are inferred once every device is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStrategy {
    /// Each device links to its predecessor in discovery order
    #[default]
    Chain,
    /// Each device links to 1..=3 randomly sampled peers
    FanOut,
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain => f.write_str("chain"),
            Self::FanOut => f.write_str("fan-out"),
        }
    }
}

impl FromStr for LinkStrategy {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chain" | "sequential" => Ok(Self::Chain),
            "fan-out" | "fanout" | "random" => Ok(Self::FanOut),
            _ => Err(TopologyError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Unordered pair key, so (a, b) and (b, a) collide
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Append-only builder for one discovery run's topology.
///
/// Devices are added first, in discovery order; a link strategy then runs
/// over the complete set and `build` freezes the result into a snapshot.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    devices: HashMap<String, Device>,
    order: Vec<String>,
    links: Vec<Link>,
    pairs: HashSet<(String, String)>,
    strategy: Option<LinkStrategy>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device; display names must be unique within a run
    pub fn add_device(&mut self, device: Device) -> Result<(), TopologyError> {
        if self.devices.contains_key(&device.name) {
            return Err(TopologyError::DuplicateDevice(device.name));
        }
        self.order.push(device.name.clone());
        self.devices.insert(device.name.clone(), device);
        Ok(())
    }

    /// Device names in discovery order
    pub fn device_names(&self) -> &[String] {
        &self.order
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Append a link unless it is a self-loop or its unordered pair already exists.
    ///
    /// Returns whether the link was added.
    pub fn add_link(&mut self, link: Link) -> Result<bool, TopologyError> {
        for end in [&link.source, &link.target] {
            if !self.devices.contains_key(end) {
                return Err(TopologyError::UnknownDevice(end.clone()));
            }
        }

        if link.source == link.target {
            return Ok(false);
        }

        if !self.pairs.insert(pair_key(&link.source, &link.target)) {
            trace!(source = %link.source, target = %link.target, "Link already present");
            return Ok(false);
        }

        self.links.push(link);
        Ok(true)
    }

    /// Run a link strategy over the current device set, returning links added
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        strategy: LinkStrategy,
        rng: &mut R,
    ) -> Result<usize, TopologyError> {
        if self.is_empty() {
            return Err(TopologyError::EmptyDeviceSet);
        }

        let added = match strategy {
            LinkStrategy::Chain => self.link_chain()?,
            LinkStrategy::FanOut => self.link_fan_out(rng)?,
        };
        self.strategy = Some(strategy);

        debug!(strategy = %strategy, devices = self.len(), links = added, "Links generated");
        Ok(added)
    }

    /// Link every device to its predecessor: N devices give N-1 links
    pub fn link_chain(&mut self) -> Result<usize, TopologyError> {
        let order = self.order.clone();
        let mut added = 0;
        for pair in order.windows(2) {
            if self.add_link(Link::ethernet(&pair[0], &pair[1]))? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// For each device draw 1..=min(3, N-1) distinct peers and link to them.
    ///
    /// Pairs already linked by an earlier device are skipped without a
    /// redraw, so a device may end up with fewer links than it drew.
    pub fn link_fan_out<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, TopologyError> {
        let order = self.order.clone();
        let max_links = MAX_FAN_OUT.min(order.len().saturating_sub(1));
        if max_links == 0 {
            return Ok(0);
        }

        let mut added = 0;
        for device in &order {
            let link_count = rng.random_range(1..=max_links);
            let peers: Vec<&String> = order.iter().filter(|d| *d != device).collect();
            let targets: Vec<String> = peers
                .choose_multiple(rng, link_count)
                .map(|t| (*t).clone())
                .collect();

            trace!(device = %device, drawn = link_count, "Sampled fan-out targets");

            for target in targets {
                if self.add_link(Link::ethernet(device, target))? {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Freeze into an immutable snapshot
    pub fn build(self) -> TopologySnapshot {
        TopologySnapshot::new(self.devices.into_iter().collect(), self.links, self.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Address, DeviceType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn builder_with(count: u8) -> TopologyBuilder {
        let mut builder = TopologyBuilder::new();
        for i in 1..=count {
            let host = format!("10.0.0.{}", i);
            let name = Device::display_name(usize::from(i - 1), &host, None);
            builder
                .add_device(Device::new(name, Address::new(host, "public"), DeviceType::Unknown))
                .unwrap();
        }
        builder
    }

    fn assert_simple_graph(links: &[Link]) {
        let mut seen = HashSet::new();
        for link in links {
            assert_ne!(link.source, link.target, "self-loop {:?}", link);
            assert!(
                seen.insert(pair_key(&link.source, &link.target)),
                "duplicate pair {:?}",
                link
            );
        }
    }

    #[test]
    fn test_chain_links_in_order() {
        for n in 1..=6 {
            let mut builder = builder_with(n);
            let added = builder.link_chain().unwrap();
            assert_eq!(added, usize::from(n) - 1);

            let names = builder.device_names().to_vec();
            for (i, link) in builder.links().iter().enumerate() {
                assert_eq!(link.source, names[i]);
                assert_eq!(link.target, names[i + 1]);
                assert_eq!(link.attribute(ATTR_LINK_TYPE), Some("ethernet"));
                assert_eq!(link.attribute(ATTR_LINK_SPEED), Some("1Gbps"));
            }
        }
    }

    #[test]
    fn test_fan_out_is_simple_graph() {
        for seed in 0..50 {
            for n in 2..=8 {
                let mut builder = builder_with(n);
                let mut rng = StdRng::seed_from_u64(seed);
                builder.link_fan_out(&mut rng).unwrap();
                assert!(!builder.links().is_empty());
                assert_simple_graph(builder.links());
            }
        }
    }

    #[test]
    fn test_fan_out_degree_bounded() {
        for seed in 0..50 {
            for n in 2..=10u8 {
                let mut builder = builder_with(n);
                let mut rng = StdRng::seed_from_u64(seed);
                builder.link_fan_out(&mut rng).unwrap();

                let max_links = MAX_FAN_OUT.min(usize::from(n) - 1);
                for name in builder.device_names() {
                    let outgoing = builder.links().iter().filter(|l| &l.source == name).count();
                    assert!(outgoing <= max_links, "{} has {} outgoing links", name, outgoing);
                }

                // every device draws at least one peer, so none is left isolated
                let snapshot = builder.build();
                assert!(snapshot.isolated_nodes().is_empty(), "seed {} n {}", seed, n);
            }
        }
    }

    #[test]
    fn test_fan_out_draws_full_range() {
        // the first device never hits an existing pair, so its links equal its draw
        let mut drawn = BTreeSet::new();
        for seed in 0..100 {
            let mut builder = builder_with(10);
            let mut rng = StdRng::seed_from_u64(seed);
            builder.link_fan_out(&mut rng).unwrap();

            let first = builder.device_names()[0].clone();
            drawn.insert(builder.links().iter().filter(|l| l.source == first).count());
        }
        assert_eq!(drawn, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_fan_out_single_device_has_no_links() {
        let mut builder = builder_with(1);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(builder.link_fan_out(&mut rng).unwrap(), 0);
    }

    #[test]
    fn test_fan_out_two_devices_single_link() {
        let mut builder = builder_with(2);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(builder.link_fan_out(&mut rng).unwrap(), 1);
    }

    #[test]
    fn test_fan_out_same_seed_same_edges() {
        let run = |seed| {
            let mut builder = builder_with(5);
            let mut rng = StdRng::seed_from_u64(seed);
            builder.apply(LinkStrategy::FanOut, &mut rng).unwrap();
            builder.links().to_vec()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_add_link_rejects_duplicates_and_loops() {
        let mut builder = builder_with(2);
        let a = builder.device_names()[0].clone();
        let b = builder.device_names()[1].clone();

        assert!(builder.add_link(Link::ethernet(&a, &b)).unwrap());
        assert!(!builder.add_link(Link::ethernet(&b, &a)).unwrap());
        assert!(!builder.add_link(Link::ethernet(&a, &a)).unwrap());
        assert_eq!(
            builder.add_link(Link::ethernet(&a, "nope")),
            Err(TopologyError::UnknownDevice("nope".to_string()))
        );
        assert_eq!(builder.links().len(), 1);
        assert!(builder.links()[0].connects(&b, &a));
    }

    #[test]
    fn test_duplicate_device_rejected() {
        let mut builder = builder_with(1);
        let dup = Device::new("Device-1 (10.0.0.1)", Address::new("10.0.0.1", "public"), DeviceType::Unknown);
        assert!(matches!(builder.add_device(dup), Err(TopologyError::DuplicateDevice(_))));
    }

    #[test]
    fn test_apply_requires_devices() {
        let mut builder = TopologyBuilder::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            builder.apply(LinkStrategy::Chain, &mut rng),
            Err(TopologyError::EmptyDeviceSet)
        );
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("chain".parse::<LinkStrategy>().unwrap(), LinkStrategy::Chain);
        assert_eq!("Fan-Out".parse::<LinkStrategy>().unwrap(), LinkStrategy::FanOut);
        assert!("mesh".parse::<LinkStrategy>().is_err());
        assert_eq!(LinkStrategy::FanOut.to_string(), "fan-out");
    }
}
