//! swarm-services: peer registry, discovery planning and the swarm service.

pub mod connector;
pub mod discovery;
pub mod registry;
pub mod swarm_service;

pub use connector::{ChannelConnector, Connector, DialRequest};
pub use discovery::DiscoveryPlan;
pub use registry::{AddressResolver, ConnectionId, PeerRegistry, PeerTables};
pub use swarm_service::{
    DiscoveryOutcome, DiscoverySettings, LifecycleState, NodeIdentity, SwarmService,
};
