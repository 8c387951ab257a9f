//! The shutdown sequence as seen by the rest of the network.

use agora::participant::AuctionOutcome;
use agora::{LifecycleState, Settlement, TickOutcome};

use crate::common::{Endowment, Harness};

#[tokio::test]
async fn test_shutdown_settles_and_says_farewell() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
        Endowment::new("carol", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    harness.get(1).bid(&auction_id, 20).await.unwrap();
    harness.step();

    let report = harness.get(0).shutdown().await;

    assert_eq!(
        report.settlements,
        vec![Settlement::Sold {
            buyer: harness.key(1),
            price: 20
        }]
    );
    assert_eq!(report.farewells_sent, 2);
    assert_eq!(report.failures, 0);
    assert!(!report.already_terminated);
    assert_eq!(harness.get(0).lifecycle(), LifecycleState::Dead);

    assert_eq!(harness.money(0), 120);
    assert_eq!(harness.money(1), 80);
    assert!(harness.has_item(1, "lamp"));

    assert!(!harness.network.is_listening(&harness.key(0)));
    for index in 1..3 {
        assert!(!harness.get(index).inspect(|s| s.peers.contains(&harness.key(0))));
        assert!(!harness.knows_auction(index, &auction_id));
    }
}

#[tokio::test]
async fn test_second_shutdown_is_a_no_op() {
    let harness = Harness::new(vec![Endowment::new("alice", 100), Endowment::new("bob", 100)]).await;

    let first = harness.get(0).shutdown().await;
    assert!(!first.already_terminated);
    let second = harness.get(0).shutdown().await;
    assert!(second.already_terminated);
    assert_eq!(second.farewells_sent, 0);
    assert_eq!(harness.get(0).participate().await, TickOutcome::Dead);
}

#[tokio::test]
async fn test_tick_before_living_runs_shutdown() {
    let mut harness = Harness::new(vec![Endowment::new("alice", 100)]).await;
    let bob = harness.join_initialised(Endowment::new("bob", 100)).await;
    assert_eq!(bob.lifecycle(), LifecycleState::Initialised);

    let TickOutcome::ShutDown(report) = bob.participate().await else {
        panic!("expected the tick to drive shutdown");
    };
    assert_eq!(report.farewells_sent, 1);
    assert_eq!(bob.lifecycle(), LifecycleState::Dead);
    assert_eq!(harness.network.endpoint_count(), 1);
    assert_eq!(harness.get(0).summary().peers, 0);
}

#[tokio::test]
async fn test_unreachable_peers_do_not_block_shutdown() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    harness.get(1).bid(&auction_id, 20).await.unwrap();

    harness.network.partition(harness.key(1));
    harness.step();
    let report = harness.get(0).shutdown().await;

    assert_eq!(report.settlements.len(), 1);
    assert!(matches!(report.settlements[0], Settlement::Failed { .. }));
    assert_eq!(report.farewells_sent, 0);
    assert!(report.failures >= 2);
    assert_eq!(harness.get(0).lifecycle(), LifecycleState::Dead);
    assert!(harness.has_item(0, "lamp"));
    assert_eq!(harness.money(1), 100);
}

#[tokio::test]
async fn test_dead_participant_leaves_network() {
    let mut harness = Harness::new(vec![Endowment::new("alice", 100)]).await;
    harness.get(0).shutdown().await;

    harness.join(Endowment::new("bob", 100)).await;
    assert_eq!(harness.get(1).summary().peers, 0);

    let TickOutcome::Ran(report) = harness.get(1).participate().await else {
        panic!("tick did not run");
    };
    assert_eq!(report.greeted, 0);
    assert_eq!(report.auction, Some(AuctionOutcome::Idle));
}
