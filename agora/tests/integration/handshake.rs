//! Peer discovery and the greet/confirm handshake over the local network.

use agora::participant::TickReport;
use agora::TickOutcome;

use crate::common::{Endowment, Harness};

async fn tick(harness: &Harness, index: usize) -> TickReport {
    match harness.get(index).participate().await {
        TickOutcome::Ran(report) => report,
        other => panic!("expected a tick to run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_discovery_registers_unconfirmed_peers() {
    let harness = Harness::new(vec![Endowment::new("alice", 100), Endowment::new("bob", 100)]).await;

    for (me, other) in [(0, 1), (1, 0)] {
        let record = harness
            .get(me)
            .inspect(|s| s.peers.get(&harness.key(other)).cloned())
            .expect("peer discovered on join");
        assert!(!record.confirmed);
        assert!(!record.greet_sent);
        assert!(!record.greet_received);
        assert!(record.display_id.is_none());
    }
}

#[tokio::test]
async fn test_handshake_confirms_then_pulls() {
    let harness = Harness::new(vec![Endowment::new("alice", 100), Endowment::new("bob", 100)]).await;

    let a = tick(&harness, 0).await;
    let b = tick(&harness, 1).await;
    assert_eq!((a.greeted, b.greeted), (1, 1));
    assert_eq!(a.failures + b.failures, 0);

    let bob_seen_by_alice = harness
        .get(0)
        .inspect(|s| s.peers.get(&harness.key(1)).cloned())
        .unwrap();
    assert!(bob_seen_by_alice.greet_sent && bob_seen_by_alice.greet_received);
    assert_eq!(bob_seen_by_alice.display_id.as_deref(), Some("bob"));

    let a = tick(&harness, 0).await;
    let b = tick(&harness, 1).await;
    assert_eq!((a.confirmed, b.confirmed), (1, 1));
    assert_eq!((a.pulled, b.pulled), (0, 0));
    assert_eq!(harness.get(0).summary().confirmed_peers, 1);

    let a = tick(&harness, 0).await;
    assert_eq!(a.pulled, 1);
    assert_eq!(a.greeted, 0);
}

#[tokio::test]
async fn test_repeated_greet_is_harmless() {
    let harness = Harness::new(vec![Endowment::new("alice", 100), Endowment::new("bob", 100)]).await;
    let bob = harness.key(1);

    harness.get(0).greet_peer(bob).await.unwrap();
    harness.get(0).greet_peer(bob).await.unwrap();

    assert_eq!(harness.get(1).summary().peers, 1);
    let record = harness
        .get(1)
        .inspect(|s| s.peers.get(&harness.key(0)).cloned())
        .unwrap();
    assert!(record.greet_received);
    assert!(!record.confirmed);
}

#[tokio::test]
async fn test_late_joiner_is_discovered_by_everyone() {
    let mut harness = Harness::new(vec![Endowment::new("alice", 100), Endowment::new("bob", 100)]).await;
    let carol = harness.join(Endowment::new("carol", 100)).await;

    assert_eq!(carol.summary().peers, 2);
    assert_eq!(harness.get(0).summary().peers, 2);
    assert_eq!(harness.get(1).summary().peers, 2);
    assert_eq!(harness.network.endpoint_count(), 3);
}
