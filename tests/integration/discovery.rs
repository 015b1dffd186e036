use std::collections::BTreeSet;
use std::time::Duration;

use swarm_core::PublicKey;

use crate::*;

#[tokio::test(start_paused = true)]
async fn chain_converges_to_full_mesh() {
    let network = Network::new(5, 5);
    // 0 - 1 - 2 - 3 - 4
    for i in 0..4 {
        network.node(i).registry().bootstrap(&host_of(i + 1), PEER_PORT);
    }
    for i in 0..network.len() {
        network.node(i).start();
    }

    for _ in 0..10 {
        tick(&network).await;
    }

    for i in 0..network.len() {
        let linked = network.linked(i);
        assert_eq!(linked.len(), 4, "node {i} linked with {linked:?}");
        assert!(!linked.contains(&network.node(i).public_key()));
    }
}

#[tokio::test(start_paused = true)]
async fn outbound_links_stop_at_desired_connectivity() {
    let network = Network::new(8, 2);
    let hub = network.node(0);
    let everyone: Vec<_> = (1..8).map(|i| network.node(i).details().details()).collect();
    hub.registry().replace_suggestions(everyone);

    hub.start();
    for _ in 0..6 {
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    }

    // First iteration: one known identity, budget of two. Afterwards none.
    assert_eq!(network.linked(0).len(), 2);
    assert_eq!(network.dials_from(0), 2);
}

#[tokio::test(start_paused = true)]
async fn own_suggestion_is_never_dialled() {
    let network = Network::new(2, 5);
    let node = network.node(0);
    node.registry()
        .replace_suggestions(vec![node.details().details()]);

    node.start();
    for _ in 0..3 {
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    }

    assert_eq!(network.dials_from(0), 0);
    assert!(network.linked(0).is_empty());
}

#[tokio::test]
async fn single_iteration_fills_one_remaining_slot() {
    let network = Network::new(7, 5);
    let node = network.node(0);
    for i in 1..=4 {
        node.registry().bootstrap(&host_of(i), PEER_PORT);
    }
    node.registry().replace_suggestions(vec![
        network.node(5).details().details(),
        network.node(6).details().details(),
    ]);

    let outcome = node.track_peers();
    assert_eq!(outcome.known, 5);
    assert_eq!(outcome.candidates, 2);
    assert_eq!(outcome.attempted.len(), 1);
    assert_eq!(network.linked(0).len(), 5);

    // Now over target: nothing more.
    let outcome = node.track_peers();
    assert!(outcome.attempted.is_empty());
}

#[tokio::test]
async fn resolver_reports_link_address() {
    let network = Network::new(2, 5);
    let node = network.node(0);
    node.registry().bootstrap(&host_of(1), PEER_PORT);

    let id = node
        .registry()
        .with_client_peers(|m| *m.keys().next().unwrap());
    assert_eq!(
        node.registry().resolve_client_address(id),
        Some(format!("{}:{}", host_of(1), PEER_PORT))
    );
}

#[test]
fn gossip_spreads_second_hand_peers() {
    let network = Network::new(3, 5);
    // 0 - 1 - 2
    network.node(0).registry().bootstrap(&host_of(1), PEER_PORT);
    network.node(1).registry().bootstrap(&host_of(2), PEER_PORT);

    network.gossip_round();

    let keys: BTreeSet<PublicKey> = network
        .node(0)
        .registry()
        .with_suggestions(|s| s.iter().map(|d| d.public_key.clone()).collect());
    assert!(keys.contains(&network.node(1).public_key()));
    assert!(keys.contains(&network.node(2).public_key()));
    assert!(!keys.contains(&network.node(0).public_key()));
}
