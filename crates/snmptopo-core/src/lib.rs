//! snmptopo Core - Device model, classification, and topology assembly
//!
//! This crate provides the foundational types for snmptopo:
//! - Address and device records produced by a discovery run
//! - Device type classification from free-text system descriptions
//! - Topology builder with chain and randomized fan-out link strategies
//! - Immutable topology snapshot handed to renderers/exporters

pub mod classify;
pub mod device;
pub mod snapshot;
pub mod topology;

pub use classify::classify;
pub use device::{Address, Device, DeviceType};
pub use snapshot::TopologySnapshot;
pub use topology::{Link, LinkStrategy, TopologyBuilder, TopologyError};
