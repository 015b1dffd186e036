//! Candidate selection for one discovery iteration.
//!
//! Given a snapshot of the registry, work out which identities are already
//! known (self plus every connected peer), which suggested entry points lead
//! to unknown nodes, and how many of those to dial. Everything here is pure;
//! the caller supplies the RNG so shuffles are reproducible under a seed.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use swarm_core::{EntryPoint, NodeDetails, PublicKey};

use crate::registry::PeerTables;

/// What one iteration decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPlan {
    /// Identities already linked, including our own.
    pub known: BTreeSet<PublicKey>,
    /// Eligible entry points before the budget was applied.
    pub candidates: usize,
    /// Dial attempts allowed this iteration.
    pub budget: usize,
    /// Entry points to bootstrap, in shuffled order.
    pub targets: Vec<EntryPoint>,
}

/// Our own key plus the key of every connected peer, either direction.
pub fn known_identities(own: &PublicKey, tables: &PeerTables) -> BTreeSet<PublicKey> {
    std::iter::once(own)
        .chain(tables.server_peers.values().map(|d| &d.public_key))
        .chain(tables.client_peers.values().map(|d| &d.public_key))
        .cloned()
        .collect()
}

/// Swarm entry points of every suggested node whose identity is not known.
pub fn candidate_entry_points(
    known: &BTreeSet<PublicKey>,
    suggestions: &[NodeDetails],
) -> Vec<EntryPoint> {
    suggestions
        .iter()
        .filter(|d| !known.contains(&d.public_key))
        .flat_map(|d| d.swarm_entry_points().cloned())
        .collect()
}

/// Dial attempts allowed when `known` identities are linked and the target is `desired`.
///
/// The count starts at `known` and every attempt adds one; dialling stops
/// once the count exceeds `desired`.
pub fn connection_budget(known: usize, desired: usize) -> usize {
    (desired + 1).saturating_sub(known)
}

/// Plan one iteration over a consistent snapshot.
pub fn plan<R: Rng + ?Sized>(
    own: &PublicKey,
    tables: &PeerTables,
    desired_connectivity: usize,
    rng: &mut R,
) -> DiscoveryPlan {
    let known = known_identities(own, tables);
    let mut targets = candidate_entry_points(&known, &tables.suggestions);
    let candidates = targets.len();

    targets.shuffle(rng);

    let budget = connection_budget(known.len(), desired_connectivity);
    targets.truncate(budget);

    DiscoveryPlan {
        known,
        candidates,
        budget,
        targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use swarm_core::{Capability, CapabilitySet};

    fn node(pk: &str, host: &str) -> NodeDetails {
        let mut d = NodeDetails::new(pk.into(), 8000, 8080);
        d.add_entry_point(EntryPoint::swarm(host, 8000, 8080));
        d
    }

    fn tables_with(connected: &[&str], suggestions: Vec<NodeDetails>) -> PeerTables {
        let mut t = PeerTables::default();
        for (i, pk) in connected.iter().enumerate() {
            let details = node(pk, "10.0.0.250");
            if i % 2 == 0 {
                t.server_peers.insert(i as u64, details);
            } else {
                t.client_peers.insert(i as u64, details);
            }
        }
        t.suggestions = suggestions;
        t
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn known_set_counts_each_identity_once() {
        let mut t = tables_with(&["p1"], vec![]);
        // p1 connected in both directions
        t.client_peers.insert(99, node("p1", "10.0.0.1"));
        let known = known_identities(&"self".into(), &t);
        assert_eq!(known.len(), 2);
    }

    #[test]
    fn budget_matches_counter_semantics() {
        assert_eq!(connection_budget(5, 5), 1);
        assert_eq!(connection_budget(2, 5), 4);
        assert_eq!(connection_budget(1, 5), 5);
        assert_eq!(connection_budget(6, 5), 0);
        assert_eq!(connection_budget(9, 5), 0);
    }

    #[test]
    fn own_identity_is_never_a_target() {
        let t = tables_with(&[], vec![node("self", "10.0.0.1"), node("p2", "10.0.0.2")]);
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].host, "10.0.0.2");
    }

    #[test]
    fn connected_peer_is_not_retargeted_through_another_entry_point() {
        let mut p1 = node("p1", "10.0.0.1");
        p1.add_entry_point(EntryPoint::swarm("172.16.0.1", 9000, 9080));
        let t = tables_with(&["p1"], vec![p1]);
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.candidates, 0);
        assert!(plan.targets.is_empty());
    }

    #[test]
    fn entry_points_without_swarm_capability_are_skipped() {
        let mut p = NodeDetails::new("p".into(), 8000, 8080);
        let mut keeper = EntryPoint::swarm("10.0.0.3", 8000, 8080);
        keeper.configuration = CapabilitySet::from_bits(1 << Capability::ChainKeeper.bit());
        p.add_entry_point(keeper);
        p.add_entry_point(EntryPoint::swarm("10.0.0.4", 8000, 8080));

        let t = tables_with(&[], vec![p]);
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.candidates, 1);
        assert_eq!(plan.targets[0].host, "10.0.0.4");
    }

    #[test]
    fn one_slot_left_yields_exactly_one_target() {
        let t = tables_with(
            &["p1", "p2", "p3", "p4"],
            vec![node("p5", "10.0.0.5"), node("p1", "10.0.0.1")],
        );
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.known.len(), 5);
        assert_eq!(plan.candidates, 1);
        assert_eq!(plan.budget, 1);
        assert_eq!(plan.targets, vec![EntryPoint::swarm("10.0.0.5", 8000, 8080)]);
    }

    #[test]
    fn budget_caps_attempts() {
        let suggestions = (0..10)
            .map(|i| node(&format!("s{i}"), &format!("10.1.0.{i}")))
            .collect();
        let t = tables_with(&["p1"], suggestions);
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.candidates, 10);
        assert_eq!(plan.targets.len(), 4);
    }

    #[test]
    fn over_connected_node_dials_nobody() {
        let t = tables_with(
            &["p1", "p2", "p3", "p4", "p5", "p6"],
            vec![node("p7", "10.0.0.7")],
        );
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.candidates, 1);
        assert!(plan.targets.is_empty());
    }

    #[test]
    fn empty_suggestions_give_empty_plan() {
        let t = tables_with(&["p1"], vec![]);
        let plan = plan(&"self".into(), &t, 5, &mut rng());
        assert_eq!(plan.candidates, 0);
        assert!(plan.targets.is_empty());
    }

    #[test]
    fn same_seed_gives_same_order() {
        let suggestions: Vec<_> = (0..8)
            .map(|i| node(&format!("s{i}"), &format!("10.2.0.{i}")))
            .collect();
        let t = tables_with(&[], suggestions);

        let a = plan(&"self".into(), &t, 20, &mut StdRng::seed_from_u64(99));
        let b = plan(&"self".into(), &t, 20, &mut StdRng::seed_from_u64(99));
        assert_eq!(a.targets, b.targets);
        assert_eq!(a.targets.len(), 8);
    }

    #[test]
    fn shuffle_spreads_first_choice() {
        // Across many seeds the first target should not always be the first suggestion.
        let suggestions: Vec<_> = (0..6)
            .map(|i| node(&format!("s{i}"), &format!("10.3.0.{i}")))
            .collect();
        let t = tables_with(&[], suggestions);

        let firsts: BTreeSet<String> = (0..64)
            .map(|seed| {
                let p = plan(&"self".into(), &t, 5, &mut StdRng::seed_from_u64(seed));
                p.targets[0].host.clone()
            })
            .collect();
        assert!(firsts.len() > 1);
    }
}
