//! Settlement failures: unreachable winners, declined exchanges, stale copies.

use agora::{ErrorCode, Settlement, StateStore};

use crate::common::{Endowment, Harness};

#[tokio::test]
async fn test_unreachable_winner_fails_settlement() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    assert!(harness.get(1).bid(&auction_id, 40).await.unwrap());

    harness.network.partition(harness.key(1));
    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();

    match settlement {
        Settlement::Failed { buyer, price, .. } => {
            assert_eq!(buyer, harness.key(1));
            assert_eq!(price, 40);
        }
        other => panic!("expected a failed settlement, got {other:?}"),
    }
    assert_eq!(harness.money(0), 100);
    assert!(harness.has_item(0, "lamp"));
    assert!(!harness.knows_auction(0, &auction_id));
    assert_eq!(harness.get(0).summary().owned_auctions, 0);

    // Bob never heard about the close.
    assert_eq!(harness.money(1), 100);
    assert!(harness.knows_auction(1, &auction_id));
}

#[tokio::test]
async fn test_stale_copy_dropped_after_unknown_auction() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();

    harness.network.partition(harness.key(1));
    harness.step();
    assert_eq!(
        harness.get(0).close_auction(&auction_id).await.unwrap(),
        Settlement::Unsold
    );
    harness.network.heal(&harness.key(1));

    let err = harness.get(1).bid(&auction_id, 30).await.unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::UnknownAuction));
    assert!(!harness.knows_auction(1, &auction_id));
}

#[tokio::test]
async fn test_buyer_declines_when_short_of_money() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 30),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    assert!(harness.get(1).bid(&auction_id, 50).await.unwrap());

    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    assert!(matches!(
        settlement,
        Settlement::Failed { price: 50, .. }
    ));

    assert_eq!(harness.money(0), 100);
    assert!(harness.has_item(0, "lamp"));
    assert_eq!(harness.money(1), 30);
    assert!(!harness.has_item(1, "lamp"));
    assert!(!harness.knows_auction(1, &auction_id));
}

#[tokio::test]
async fn test_bids_after_close_are_not_recorded() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
        Endowment::new("carol", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    assert!(harness.get(1).bid(&auction_id, 25).await.unwrap());

    // Carol misses the close announcement and keeps bidding.
    harness.network.partition(harness.key(2));
    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    assert!(matches!(settlement, Settlement::Sold { price: 25, .. }));
    harness.network.heal(&harness.key(2));

    let err = harness.get(2).bid(&auction_id, 90).await.unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::UnknownAuction));
    assert_eq!(harness.money(2), 100);
}

#[tokio::test]
async fn test_auctioneer_ignores_leftover_copies_of_closed_auction() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
        Endowment::new("carol", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    harness.get(1).bid(&auction_id, 20).await.unwrap();

    harness.network.partition(harness.key(2));
    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    assert!(matches!(settlement, Settlement::Sold { price: 20, .. }));
    harness.network.heal(&harness.key(2));
    assert!(harness.knows_auction(2, &auction_id));

    // Carol still advertises the closed auction.
    let stats = harness.get(0).request_auctions(harness.key(2)).await.unwrap();
    assert_eq!(stats.adopted, 0);
    assert!(!harness.knows_auction(0, &auction_id));

    let err = harness.get(2).bid(&auction_id, 30).await.unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::UnknownAuction));
    assert!(!harness.knows_auction(2, &auction_id));
    assert_eq!(harness.money(2), 100);
}

#[tokio::test]
async fn test_auction_record_deleted_after_settlement() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    let record_key = format!("auction.{}.{}", harness.key(0), auction_id);

    harness.step();
    harness.get(1).bid(&auction_id, 20).await.unwrap();
    assert!(harness.store(0).get(&record_key).await.unwrap().is_some());

    harness.step();
    harness.get(0).close_auction(&auction_id).await.unwrap();
    assert!(harness.store(0).get(&record_key).await.unwrap().is_none());
}
