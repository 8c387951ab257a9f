use crate::identity::PeerKey;
use crate::marketplace::ledger::{InventoryItem, ItemId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type AuctionId = String;

/// A single bid on an auction. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Requester's clock at the time the bid was sent
    pub bid_time: u64,
    pub bidder_public_key: PeerKey,
    pub value: u64,
}

impl Bid {
    pub const fn new(bid_time: u64, bidder_public_key: PeerKey, value: u64) -> Self {
        Self {
            bid_time,
            bidder_public_key,
            value,
        }
    }
}

/// Highest value first; equal values go to the earlier bid.
fn rank(a: &Bid, b: &Bid) -> Ordering {
    b.value.cmp(&a.value).then(a.bid_time.cmp(&b.bid_time))
}

/// An English auction as seen by one participant.
///
/// The auctioneer holds the authoritative copy. Everyone else holds an
/// advisory copy that is only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    #[serde(rename = "auctionID")]
    pub auction_id: AuctionId,
    pub open_time: u64,
    #[serde(rename = "auctioneerID")]
    pub auctioneer_id: String,
    pub auctioneer_public_key: PeerKey,
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
    pub current_value: u64,
    /// Sorted by value descending, ties broken by earliest `bid_time`.
    pub bids: Vec<Bid>,
    pub highest_bidder: PeerKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<u64>,
}

impl Auction {
    /// A fresh auction for `item`, seeded with the auctioneer's own bid at
    /// the item's base value.
    pub fn open(
        auction_id: AuctionId,
        item: &InventoryItem,
        auctioneer_id: impl Into<String>,
        auctioneer_public_key: PeerKey,
        now: u64,
    ) -> Self {
        Self {
            auction_id,
            open_time: now,
            auctioneer_id: auctioneer_id.into(),
            auctioneer_public_key,
            item_id: item.item_id.clone(),
            current_value: item.base_value,
            bids: vec![Bid::new(now, auctioneer_public_key, item.base_value)],
            highest_bidder: auctioneer_public_key,
            close_time: None,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.close_time.is_none()
    }

    /// Latest bid time, or the open time when there are no bids.
    pub fn recent_bid_time(&self) -> u64 {
        self.bids
            .iter()
            .map(|bid| bid.bid_time)
            .max()
            .unwrap_or(self.open_time)
    }

    /// Whether anyone besides the opening bid has bid.
    pub fn has_competing_bids(&self) -> bool {
        self.bids.len() > 1
    }

    /// Highest bid in any position, valid or not.
    pub fn top_bid(&self) -> Option<&Bid> {
        self.bids.first()
    }

    /// Insert a bid and restore ordering.
    ///
    /// Returns whether the bid now leads among the valid bids. A bid
    /// stamped before `open_time` is kept but never leads.
    pub fn insert_bid(&mut self, bid: Bid) -> bool {
        let position = self
            .bids
            .partition_point(|existing| rank(existing, &bid) != Ordering::Greater);
        self.bids.insert(position, bid);
        self.sync_leader();
        self.winning_index() == Some(position)
    }

    /// Close the auction at `now` and determine the winner.
    ///
    /// Only bids with `open_time <= bid_time < now` count. Returns `None`
    /// when no bid falls inside that window; the leader fields are left as
    /// they were in that case.
    pub fn close(&mut self, now: u64) -> Option<Bid> {
        self.close_time = Some(now);
        let winner = self.winning_bid().cloned();
        if let Some(bid) = &winner {
            self.current_value = bid.value;
            self.highest_bidder = bid.bidder_public_key;
        }
        winner
    }

    /// Best bid inside the valid window `[open_time, close_time)`.
    ///
    /// For an auction that is still open every bid at or after `open_time`
    /// is eligible.
    pub fn winning_bid(&self) -> Option<&Bid> {
        self.winning_index().and_then(|i| self.bids.get(i))
    }

    /// `bids` is kept sorted, so the first bid inside the window wins.
    fn winning_index(&self) -> Option<usize> {
        let close = self.close_time.unwrap_or(u64::MAX);
        self.bids
            .iter()
            .position(|bid| bid.bid_time >= self.open_time && bid.bid_time < close)
    }

    fn sync_leader(&mut self) {
        if let Some((value, bidder)) = self
            .winning_bid()
            .map(|leader| (leader.value, leader.bidder_public_key))
        {
            self.current_value = value;
            self.highest_bidder = bidder;
        }
    }
}
