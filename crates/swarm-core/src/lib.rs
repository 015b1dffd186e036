//! swarm-core: node data model, shared node details, configuration and
//! peer-link frame format. All other swarm crates depend on this one.

pub mod config;
pub mod identity;
pub mod node;
pub mod shared;
pub mod wire;

pub use node::{Capability, CapabilitySet, EntryPoint, NodeDetails, PublicKey, LOOPBACK_HOST};
pub use shared::SharedNodeDetails;
