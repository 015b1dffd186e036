use std::time::Duration;

use crate::*;
use swarm_services::LifecycleState;

#[tokio::test(start_paused = true)]
async fn stopped_node_makes_no_further_attempts() {
    let network = Network::new(4, 5);
    let node = network.node(0);
    node.registry()
        .replace_suggestions(vec![network.node(1).details().details()]);

    node.start();
    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    assert_eq!(network.dials_from(0), 1);

    node.stop();
    node.join().await;
    assert_eq!(node.state(), LifecycleState::Stopped);

    node.registry().replace_suggestions(vec![
        network.node(2).details().details(),
        network.node(3).details().details(),
    ]);
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(network.dials_from(0), 1);
}

#[tokio::test(start_paused = true)]
async fn restarted_node_resumes_discovery() {
    let network = Network::new(3, 5);
    let node = network.node(0);

    node.start();
    node.stop();
    node.join().await;

    node.registry().replace_suggestions(vec![
        network.node(1).details().details(),
        network.node(2).details().details(),
    ]);
    node.start();
    assert_eq!(node.state(), LifecycleState::Running);

    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    assert_eq!(network.linked(0).len(), 2);
    node.stop();
}
