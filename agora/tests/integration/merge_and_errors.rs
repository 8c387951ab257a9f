//! Auction view merging and the protocol's error replies.

use agora::protocol::{
    decode_response, encode_request, AuctionBody, BidBody, BidReply, CloseReply, Response,
};
use agora::{ErrorCode, Identity, Method, MessageTransport};

use crate::common::{Endowment, Harness};

fn market() -> Vec<Endowment> {
    vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
    ]
}

#[tokio::test]
async fn test_late_joiner_pulls_and_merges() {
    let mut harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    let carol = harness.join(Endowment::new("carol", 100)).await;
    assert!(!harness.knows_auction(2, &auction_id));

    let stats = carol.request_auctions(harness.key(0)).await.unwrap();
    assert_eq!(stats.adopted, 1);
    assert!(harness.knows_auction(2, &auction_id));

    harness.step();
    harness.get(1).bid(&auction_id, 30).await.unwrap();

    // Bob's copy carries the newer bid.
    let stats = carol.request_auctions(harness.key(1)).await.unwrap();
    assert_eq!(stats.replaced, 1);
    let value = carol.inspect(|s| s.registry.get(&auction_id).map(|a| a.current_value));
    assert_eq!(value, Some(30));

    // Alice's copy is just as recent, so carol keeps hers.
    let stats = carol.request_auctions(harness.key(0)).await.unwrap();
    assert_eq!((stats.adopted, stats.replaced, stats.kept), (0, 0, 1));
}

#[tokio::test]
async fn test_owned_auction_survives_merge() {
    let harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    harness.step();
    harness.get(1).bid(&auction_id, 30).await.unwrap();

    let stats = harness.get(0).request_auctions(harness.key(1)).await.unwrap();
    assert_eq!(stats.kept, 1);
    assert!(harness.get(0).inspect(|s| s.registry.is_owned(&auction_id)));
}

#[tokio::test]
async fn test_close_from_non_auctioneer_rejected() {
    let harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    let auction = harness
        .get(1)
        .inspect(|s| s.registry.get(&auction_id).cloned())
        .unwrap();
    let mallory = Identity::from_seed([9u8; 32], "mallory");

    let payload = encode_request(&mallory, harness.time.get(), AuctionBody { auction }).unwrap();
    let bytes = harness
        .network
        .request(&harness.key(1), Method::CloseAuction, payload)
        .await
        .unwrap();
    let response: Response<CloseReply> = decode_response(&bytes).unwrap();

    assert!(!response.body.auction_deleted);
    let err = response.body.into_result().unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::WrongAuctioneer));
    assert!(harness.knows_auction(1, &auction_id));
}

#[tokio::test]
async fn test_close_of_unknown_auction_rejected() {
    let harness = Harness::new(market()).await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();
    let mut auction = harness
        .get(1)
        .inspect(|s| s.registry.get(&auction_id).cloned())
        .unwrap();
    auction.auction_id = "forgotten".into();

    let alice = harness.get(0).identity();
    let payload = encode_request(alice, harness.time.get(), AuctionBody { auction }).unwrap();
    let bytes = harness
        .network
        .request(&harness.key(1), Method::CloseAuction, payload)
        .await
        .unwrap();
    let response: Response<CloseReply> = decode_response(&bytes).unwrap();

    let err = response.body.into_result().unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::UnknownAuction));
}

#[tokio::test]
async fn test_bid_sent_to_copy_holder_points_at_auctioneer() {
    let harness = Harness::new(vec![
        Endowment::new("alice", 100).with_item("lamp", 10),
        Endowment::new("bob", 100),
        Endowment::new("carol", 100),
    ])
    .await;
    let auction_id = harness.get(0).open_auction().await.unwrap().unwrap();

    let carol = harness.get(2).identity();
    let body = BidBody {
        auction_id: auction_id.clone(),
        value: 50,
    };
    let payload = encode_request(carol, harness.time.get(), body).unwrap();
    let bytes = harness
        .network
        .request(&harness.key(1), Method::Bid, payload)
        .await
        .unwrap();
    let response: Response<BidReply> = decode_response(&bytes).unwrap();

    assert_eq!(response.body.see_auctioneer, Some(harness.key(0)));
    let err = response.body.into_result().unwrap_err();
    assert_eq!(err.protocol_code(), Some(ErrorCode::WrongAuctioneer));

    let bids = harness
        .get(0)
        .inspect(|s| s.registry.get(&auction_id).map(|a| a.bids.len()));
    assert_eq!(bids, Some(1));
}

#[tokio::test]
async fn test_forged_requester_rejected() {
    let harness = Harness::new(market()).await;
    let mallory = Identity::from_seed([9u8; 32], "mallory");

    // Signed by mallory but claiming to come from alice.
    let alice = harness.get(0).identity();
    let json = serde_json::to_vec(&serde_json::json!({
        "requestTime": harness.time.get(),
        "requesterID": alice.display_id(),
        "requesterPublicKey": alice.public_key(),
    }))
    .unwrap();
    let payload = agora::protocol::SignedEnvelope::sign(json, &mallory)
        .to_bytes()
        .unwrap();

    let result = harness
        .network
        .request(&harness.key(1), Method::Farewell, payload)
        .await;
    assert!(result.is_err());
    assert!(harness.get(1).inspect(|s| s.peers.contains(&harness.key(0))));
}
