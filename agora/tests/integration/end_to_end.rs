//! A full auction: open, bid, close and settle between live participants.

use agora::participant::AuctionOutcome;
use agora::{Settlement, TickOutcome};

use crate::common::{Endowment, Harness};

fn market() -> Vec<Endowment> {
    vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
        Endowment::new("carol", 100),
    ]
}

#[tokio::test]
async fn test_open_announces_to_every_peer() {
    let harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();

    for index in 0..3 {
        assert!(harness.knows_auction(index, &auction_id));
    }
    let copy = harness
        .get(1)
        .inspect(|s| s.registry.get(&auction_id).cloned())
        .unwrap();
    assert_eq!(copy.auctioneer_public_key, harness.key(0));
    assert_eq!(copy.item_id, "lamp");
    assert_eq!(copy.current_value, 10);
    assert!(harness.get(0).inspect(|s| s.registry.is_owned(&auction_id)));
    assert!(!harness.get(1).inspect(|s| s.registry.is_owned(&auction_id)));

    // Only one item, and it is already listed.
    assert_eq!(harness.get(0).open_auction().await.unwrap(), None);
}

#[tokio::test]
async fn test_highest_bid_wins_and_settles() {
    let harness = Harness::new(market()).await;
    let total_before = harness.total_money();
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();

    harness.step();
    assert!(harness.get(1).bid(&auction_id, 20).await.unwrap());
    harness.step();
    assert!(!harness.get(2).bid(&auction_id, 15).await.unwrap());
    harness.step();
    // Equal value arriving later does not take the lead.
    assert!(!harness.get(2).bid(&auction_id, 20).await.unwrap());

    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    assert_eq!(
        settlement,
        Settlement::Sold {
            buyer: harness.key(1),
            price: 20
        }
    );

    assert_eq!(harness.money(0), 120);
    assert!(!harness.has_item(0, "lamp"));
    assert_eq!(harness.money(1), 80);
    let bought = harness
        .get(1)
        .inspect(|s| s.ledger.item("lamp").cloned())
        .unwrap();
    assert_eq!(bought.base_value, 20);
    assert_eq!(bought.acquired_time, Some(harness.time.get()));
    assert_eq!(harness.money(2), 100);
    assert_eq!(harness.total_money(), total_before);

    for index in 0..3 {
        assert!(!harness.knows_auction(index, &auction_id));
    }
}

#[tokio::test]
async fn test_close_without_competing_bids_keeps_item() {
    let harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();

    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    assert_eq!(settlement, Settlement::Unsold);
    assert!(harness.has_item(0, "lamp"));
    assert_eq!(harness.money(0), 100);
    assert!(!harness.knows_auction(1, &auction_id));
}

#[tokio::test]
async fn test_bid_on_unknown_auction_fails() {
    let harness = Harness::new(market()).await;
    assert!(harness.get(1).bid("no-such-auction", 5).await.is_err());
}

#[tokio::test]
async fn test_ticks_drive_a_sale() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10).with_item("vase", 7),
        Endowment::new("bob", 100),
    ])
    .await;

    // Alice opens while she knows fewer than two auctions.
    for _ in 0..2 {
        harness.step();
        let TickOutcome::Ran(report) = harness.get(0).participate().await else {
            panic!("tick did not run");
        };
        assert!(matches!(report.auction, Some(AuctionOutcome::Opened(_))));
    }
    assert_eq!(harness.get(1).summary().known_auctions, 2);

    // Bob has two foreign auctions and money, so every tick is a bid.
    harness.step();
    let TickOutcome::Ran(report) = harness.get(1).participate().await else {
        panic!("tick did not run");
    };
    let Some(AuctionOutcome::Bid { auction_id, value, .. }) = report.auction else {
        panic!("expected a bid, got {:?}", report.auction);
    };
    assert!(value < 100);

    let competing = harness.get(0).inspect(|s| {
        s.registry
            .get(&auction_id)
            .is_some_and(|auction| auction.has_competing_bids())
    });
    assert!(competing);

    harness.step();
    let settlement = harness.get(0).close_auction(&auction_id).await.unwrap();
    let total_items = harness.get(0).summary().items + harness.get(1).summary().items;
    assert_eq!(total_items, 2);
    assert_eq!(harness.total_money(), 200);
    match settlement {
        Settlement::Sold { buyer, price } => {
            assert_eq!(buyer, harness.key(1));
            assert_eq!(price, value);
        }
        // A zero bid ties below the opening bid and leaves the item unsold.
        Settlement::Unsold => assert!(value <= 10),
        other => panic!("unexpected settlement {other:?}"),
    }
}
