use crate::error::{AgoraError, AgoraResult, ErrorCode};
use crate::identity::PeerKey;
use crate::marketplace::auction::{Auction, AuctionId, Bid};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of offering a bid to this participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidDecision {
    /// Recorded (or ignored because the auction already closed).
    Accepted { auction: Auction, best_bid: bool },
    /// Not ours to judge.
    Rejected {
        code: ErrorCode,
        see_auctioneer: Option<PeerKey>,
        auction: Option<Auction>,
    },
}

/// Counts from one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub adopted: usize,
    pub replaced: usize,
    pub kept: usize,
}

/// Every auction this participant knows about, and which of them it runs.
///
/// Every owned ID is also a known ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRegistry {
    known: BTreeMap<AuctionId, Auction>,
    owned: BTreeSet<AuctionId>,
}

impl AuctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, auction_id: &str) -> Option<&Auction> {
        self.known.get(auction_id)
    }

    pub fn is_owned(&self, auction_id: &str) -> bool {
        self.owned.contains(auction_id)
    }

    pub fn known(&self) -> &BTreeMap<AuctionId, Auction> {
        &self.known
    }

    pub fn known_ids(&self) -> Vec<AuctionId> {
        self.known.keys().cloned().collect()
    }

    pub fn owned_ids(&self) -> Vec<AuctionId> {
        self.owned.iter().cloned().collect()
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn owned_len(&self) -> usize {
        self.owned.len()
    }

    /// Items currently up for auction by us.
    pub fn items_on_auction(&self) -> BTreeSet<&str> {
        self.owned
            .iter()
            .filter_map(|id| self.known.get(id))
            .map(|auction| auction.item_id.as_str())
            .collect()
    }

    /// Register an auction we just opened.
    pub fn insert_owned(&mut self, auction: Auction) -> AgoraResult<()> {
        if self.known.contains_key(&auction.auction_id) {
            return Err(AgoraError::InvalidState(format!(
                "auction {} already registered",
                auction.auction_id
            )));
        }
        self.owned.insert(auction.auction_id.clone());
        self.known.insert(auction.auction_id.clone(), auction);
        Ok(())
    }

    /// Store an advisory copy announced by its auctioneer.
    ///
    /// Returns false if the ID belongs to an auction we own, which is never
    /// overwritten from outside, or if the copy names `me` as auctioneer:
    /// an auction of ours that is not owned has already been closed.
    pub fn insert_remote(&mut self, auction: Auction, me: &PeerKey) -> bool {
        if self.owned.contains(&auction.auction_id) || auction.auctioneer_public_key == *me {
            return false;
        }
        self.known.insert(auction.auction_id.clone(), auction);
        true
    }

    /// Replace an advisory copy we still hold. Owned or absent IDs are left alone.
    pub fn refresh_remote(&mut self, auction: Auction) -> bool {
        if self.owned.contains(&auction.auction_id) || !self.known.contains_key(&auction.auction_id)
        {
            return false;
        }
        self.known.insert(auction.auction_id.clone(), auction);
        true
    }

    /// Take a persisted copy of an owned auction if it is strictly newer.
    pub fn restore_owned(&mut self, auction: Auction) -> bool {
        if !self.owned.contains(&auction.auction_id) {
            return false;
        }
        match self.known.get(&auction.auction_id) {
            Some(local) if auction.recent_bid_time() <= local.recent_bid_time() => false,
            _ => {
                self.known.insert(auction.auction_id.clone(), auction);
                true
            }
        }
    }

    pub fn remove(&mut self, auction_id: &str) -> Option<Auction> {
        self.owned.remove(auction_id);
        self.known.remove(auction_id)
    }

    /// Fold a peer's view into ours.
    ///
    /// Unknown auctions are adopted as-is. For known ones the copy with the
    /// strictly later `recent_bid_time` wins. Auctions we own are never
    /// replaced, and copies of auctions `me` ran but no longer owns are
    /// dropped rather than adopted.
    pub fn merge(&mut self, remote: BTreeMap<AuctionId, Auction>, me: &PeerKey) -> MergeStats {
        let mut stats = MergeStats::default();
        for (id, incoming) in remote {
            let stale_own = incoming.auctioneer_public_key == *me && !self.owned.contains(&id);
            if incoming.auction_id != id || stale_own {
                stats.kept += 1;
                continue;
            }
            match self.known.get(&id) {
                None => {
                    self.known.insert(id, incoming);
                    stats.adopted += 1;
                }
                Some(_) if self.owned.contains(&id) => stats.kept += 1,
                Some(local) if incoming.recent_bid_time() > local.recent_bid_time() => {
                    self.known.insert(id, incoming);
                    stats.replaced += 1;
                }
                Some(_) => stats.kept += 1,
            }
        }
        stats
    }

    /// Offer a bid on `auction_id`; only the auctioneer records it.
    ///
    /// A leftover copy of an auction `me` ran and already closed is evicted
    /// and reported as unknown.
    pub fn record_bid(&mut self, auction_id: &str, bid: Bid, me: &PeerKey) -> BidDecision {
        let unknown = BidDecision::Rejected {
            code: ErrorCode::UnknownAuction,
            see_auctioneer: None,
            auction: None,
        };
        let stale_own = !self.owned.contains(auction_id)
            && self
                .known
                .get(auction_id)
                .is_some_and(|auction| auction.auctioneer_public_key == *me);
        if stale_own {
            self.known.remove(auction_id);
            return unknown;
        }
        let Some(auction) = self.known.get_mut(auction_id) else {
            return unknown;
        };
        if !self.owned.contains(auction_id) {
            return BidDecision::Rejected {
                code: ErrorCode::WrongAuctioneer,
                see_auctioneer: Some(auction.auctioneer_public_key),
                auction: Some(auction.clone()),
            };
        }
        if !auction.is_open() {
            return BidDecision::Accepted {
                auction: auction.clone(),
                best_bid: false,
            };
        }
        let best_bid = auction.insert_bid(bid);
        BidDecision::Accepted {
            auction: auction.clone(),
            best_bid,
        }
    }

    /// Stamp the close time on an owned open auction and pick its winner.
    pub fn close_owned(&mut self, auction_id: &str, now: u64) -> AgoraResult<(Auction, Option<Bid>)> {
        if !self.owned.contains(auction_id) {
            return Err(AgoraError::InvalidArgument(format!(
                "auction {auction_id} is not owned by this participant"
            )));
        }
        let auction = self
            .known
            .get_mut(auction_id)
            .ok_or_else(|| AgoraError::NotFound(format!("auction {auction_id}")))?;
        if !auction.is_open() {
            return Err(AgoraError::InvalidState(format!(
                "auction {auction_id} is already closing"
            )));
        }
        let winner = auction.close(now);
        Ok((auction.clone(), winner))
    }
}
