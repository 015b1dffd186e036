//! Swarm service: owns this node's self-description and keeps it connected.
//!
//! Once started, a single task repeats: wait one discovery interval on a
//! tokio timer, plan against a registry snapshot, bootstrap the chosen entry
//! points, then continue if still running. The wait yields to the runtime, so
//! connection handling and HTTP requests proceed while discovery is idle.
//!
//! `stop` is cooperative. An iteration already waiting still runs its
//! bootstrap attempts, then the loop ends without scheduling another.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::task::JoinHandle;

use swarm_core::config::DiscoveryConfig;
use swarm_core::{EntryPoint, NodeDetails, PublicKey, SharedNodeDetails};

use crate::discovery;
use crate::registry::PeerRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped,
    Running,
}

/// How this node describes itself at construction.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub public_key: PublicKey,
    pub peer_port: u16,
    pub http_port: u16,
    /// Host for the self entry point. Usually the loopback placeholder.
    pub advertise_host: String,
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub interval: Duration,
    pub desired_connectivity: usize,
    pub shuffle_seed: Option<u64>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(c: &DiscoveryConfig) -> Self {
        Self {
            interval: c.interval(),
            desired_connectivity: c.desired_connectivity,
            shuffle_seed: c.shuffle_seed,
        }
    }
}

/// Result of one discovery iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub known: usize,
    pub candidates: usize,
    pub attempted: Vec<EntryPoint>,
}

#[derive(Clone)]
pub struct SwarmService {
    inner: Arc<Inner>,
}

struct Inner {
    details: SharedNodeDetails,
    registry: PeerRegistry,
    settings: DiscoverySettings,
    running: AtomicBool,
    /// Bumped on every start; a loop from an earlier start exits on mismatch.
    generation: AtomicU64,
    /// Held for a whole iteration, so iterations never overlap.
    rng: Mutex<StdRng>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SwarmService {
    /// Build the service and seed this node's own entry point.
    pub fn new(identity: NodeIdentity, settings: DiscoverySettings, registry: PeerRegistry) -> Self {
        let mut details =
            NodeDetails::new(identity.public_key, identity.peer_port, identity.http_port);
        details.add_entry_point(EntryPoint::swarm(
            identity.advertise_host,
            identity.peer_port,
            identity.http_port,
        ));

        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            inner: Arc::new(Inner {
                details: SharedNodeDetails::new(details),
                registry,
                settings,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                rng: Mutex::new(rng),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn details(&self) -> &SharedNodeDetails {
        &self.inner.details
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.inner.settings
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.details.public_key()
    }

    pub fn state(&self) -> LifecycleState {
        if self.inner.running.load(Ordering::Acquire) {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    /// Replace the loopback placeholder in our entry points once the external
    /// address is known. Returns how many entry points changed.
    pub fn set_advertised_host(&self, host: &str) -> usize {
        let n = self.inner.details.with_details(|d| d.set_advertised_host(host));
        tracing::info!(host, rewritten = n, "advertised host updated");
        n
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Transition to Running and schedule the first iteration.
    ///
    /// Must be called from within a tokio runtime. No-op if already running.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            tracing::warn!("swarm service already running");
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let service = self.clone();
        let handle = tokio::spawn(async move { service.discovery_loop(generation).await });

        let previous = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if previous.is_some() {
            tracing::debug!("previous discovery loop will exit after its current iteration");
        }

        let public_key = self.public_key();
        tracing::info!(
            public_key = public_key.short(),
            interval_ms = self.inner.settings.interval.as_millis() as u64,
            desired = self.inner.settings.desired_connectivity,
            "swarm service started"
        );
    }

    /// Transition to Stopped. The loop ends after its in-flight iteration.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::AcqRel) {
            tracing::info!("swarm service stopping");
        }
    }

    /// Wait for the most recently started loop to finish.
    pub async fn join(&self) {
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "discovery loop panicked");
            }
        }
    }

    fn should_continue(&self, generation: u64) -> bool {
        self.inner.running.load(Ordering::Acquire)
            && self.inner.generation.load(Ordering::Acquire) == generation
    }

    async fn discovery_loop(self, generation: u64) {
        loop {
            tokio::time::sleep(self.inner.settings.interval).await;

            let outcome = self.track_peers();
            tracing::debug!(
                known = outcome.known,
                candidates = outcome.candidates,
                attempted = outcome.attempted.len(),
                "discovery iteration complete"
            );

            if !self.should_continue(generation) {
                break;
            }
        }
        tracing::info!("discovery loop stopped");
    }

    // ── Discovery ─────────────────────────────────────────────────────────────

    /// Run one discovery iteration now, without the interval wait.
    pub fn track_peers(&self) -> DiscoveryOutcome {
        let own = self.public_key();
        let desired = self.inner.settings.desired_connectivity;

        let mut rng = self.inner.rng.lock().unwrap_or_else(|e| e.into_inner());
        let plan = self
            .inner
            .registry
            .with_snapshot(|tables| discovery::plan(&own, tables, desired, &mut *rng));

        for target in &plan.targets {
            tracing::info!(peer = %target.address(), "bootstrapping peer");
            self.inner.registry.bootstrap(&target.host, target.port);
        }

        if plan.targets.len() < plan.budget {
            tracing::info!(
                known = plan.known.len(),
                desired,
                candidates = plan.candidates,
                "not enough candidates to reach desired connectivity"
            );
        }

        DiscoveryOutcome {
            known: plan.known.len(),
            candidates: plan.candidates,
            attempted: plan.targets,
        }
    }
}
