//! Requests a participant sends on its own initiative.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::Participant;
use crate::error::{AgoraError, AgoraResult, ErrorCode};
use crate::identity::{random_object_id, PeerKey};
use crate::marketplace::{Auction, AuctionId, InventoryItem, MergeStats};
use crate::protocol::{
    decode_response, encode_request, AuctionBody, AuctionsReply, BidBody, BidReply, Empty,
    ExchangeBody, ExchangeReply, Method, Response,
};
use crate::traits::{MessageTransport, RandomSource, StateStore, TimeProvider};

/// How the close of an owned auction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The winner confirmed the exchange; money credited, item handed over.
    Sold { buyer: PeerKey, price: u64 },
    /// No other bidder won; the item stays.
    Unsold,
    /// The winner could not be settled with; nothing credited.
    Failed {
        buyer: PeerKey,
        price: u64,
        reason: String,
    },
}

impl<T, C, R, S> Participant<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    async fn send<B, Rep>(
        &self,
        peer: &PeerKey,
        method: Method,
        body: B,
    ) -> AgoraResult<Response<Rep>>
    where
        B: Serialize + Send,
        Rep: DeserializeOwned,
    {
        let payload = encode_request(&self.identity, self.now(), body)?;
        let bytes = self.transport.request(peer, method, payload).await?;
        decode_response(&bytes)
    }

    /// Send `method` to every peer in `peers` concurrently.
    ///
    /// Returns how many peers answered. Failures are logged.
    pub(crate) async fn broadcast<B>(
        self: &Arc<Self>,
        peers: Vec<PeerKey>,
        method: Method,
        body: B,
    ) -> usize
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        let mut tasks = JoinSet::new();
        for peer in peers {
            let this = Arc::clone(self);
            let body = body.clone();
            tasks.spawn(async move {
                let result: AgoraResult<Response<serde_json::Value>> =
                    this.send(&peer, method, body).await;
                (peer, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => delivered += 1,
                Ok((peer, Err(e))) => warn!(
                    "[{}] {} to {} failed: {}",
                    self.display_id(),
                    method,
                    peer.short(),
                    e
                ),
                Err(e) => error!("[{}] {} task panicked: {}", self.display_id(), method, e),
            }
        }
        delivered
    }

    /// Greet `peer` and record that our greet was answered.
    pub async fn greet_peer(&self, peer: PeerKey) -> AgoraResult<()> {
        let response: Response<Empty> = self.send(&peer, Method::Greet, Empty {}).await?;
        let responder = response.responder;
        if responder.responder_public_key != peer {
            return Err(AgoraError::InvalidArgument(format!(
                "greet to {} answered by {}",
                peer.short(),
                responder.responder_public_key.short()
            )));
        }
        self.state
            .lock()
            .peers
            .mark_greet_sent(peer, Some(responder.responder_id.clone()));
        debug!("[{}] greeted {}", self.display_id(), responder.responder_id);
        Ok(())
    }

    /// Pull `peer`'s auction view and merge it into ours.
    pub async fn request_auctions(&self, peer: PeerKey) -> AgoraResult<MergeStats> {
        let response: Response<AuctionsReply> =
            self.send(&peer, Method::RequestAuction, Empty {}).await?;
        let stats = self
            .state
            .lock()
            .registry
            .merge(response.body.known_auctions, &self.public_key());
        if stats.adopted + stats.replaced > 0 {
            debug!(
                "[{}] merged auctions from {}: {} new, {} updated",
                self.display_id(),
                response.responder.responder_id,
                stats.adopted,
                stats.replaced
            );
        }
        Ok(stats)
    }

    /// Put an inventory item up for auction and announce it.
    ///
    /// Items already up for auction are skipped; returns `None` when nothing
    /// is left to sell.
    pub async fn open_auction(self: &Arc<Self>) -> AgoraResult<Option<AuctionId>> {
        let now = self.now();
        let auction_id = random_object_id(&self.random);

        let (auction, peers) = {
            let mut state = self.state.lock();
            let candidates: Vec<InventoryItem> = {
                let listed = state.registry.items_on_auction();
                state
                    .ledger
                    .items()
                    .filter(|item| !listed.contains(item.item_id.as_str()))
                    .cloned()
                    .collect()
            };
            if candidates.is_empty() {
                return Ok(None);
            }
            let first = auction_id.bytes().next().unwrap_or(0);
            let index = usize::from(first) % candidates.len();
            let auction = Auction::open(
                auction_id.clone(),
                &candidates[index],
                self.display_id(),
                self.public_key(),
                now,
            );
            state.registry.insert_owned(auction.clone())?;
            (auction, state.peers.keys())
        };

        info!(
            "[{}] opened auction {} for {} at {}",
            self.display_id(),
            auction.auction_id,
            auction.item_id,
            auction.current_value
        );
        self.broadcast(peers, Method::OpenAuction, AuctionBody { auction })
            .await;
        Ok(Some(auction_id))
    }

    /// Bid `value` on a known auction run by someone else.
    ///
    /// Returns whether the auctioneer reports our bid as the best one.
    pub async fn bid(&self, auction_id: &str, value: u64) -> AgoraResult<bool> {
        let auctioneer = {
            let state = self.state.lock();
            let auction = state
                .registry
                .get(auction_id)
                .ok_or_else(|| AgoraError::NotFound(format!("auction {auction_id}")))?;
            if state.registry.is_owned(auction_id) {
                return Err(AgoraError::InvalidArgument(format!(
                    "cannot bid on own auction {auction_id}"
                )));
            }
            auction.auctioneer_public_key
        };

        let body = BidBody {
            auction_id: auction_id.to_string(),
            value,
        };
        let response: Response<BidReply> = self.send(&auctioneer, Method::Bid, body).await?;
        match response.body.into_result() {
            Ok((auction, best_bid)) => {
                self.state.lock().registry.refresh_remote(auction);
                debug!(
                    "[{}] bid {} on {} (best: {})",
                    self.display_id(),
                    value,
                    auction_id,
                    best_bid
                );
                Ok(best_bid)
            }
            Err(e) => {
                if e.protocol_code() == Some(ErrorCode::UnknownAuction) {
                    let mut state = self.state.lock();
                    if !state.registry.is_owned(auction_id) {
                        state.registry.remove(auction_id);
                    }
                }
                Err(e)
            }
        }
    }

    /// Bid a random amount below our balance. Returns the value and whether it leads.
    pub async fn place_random_bid(&self, auction_id: &str) -> AgoraResult<(u64, bool)> {
        let money = self.state.lock().ledger.money();
        if money == 0 {
            return Err(AgoraError::InvalidState("no money left to bid".into()));
        }
        let value = self.random.below(money);
        let best = self.bid(auction_id, value).await?;
        Ok((value, best))
    }

    /// Close an owned auction, announce it and settle with the winner.
    ///
    /// The auction leaves the registry, and its stored record is deleted,
    /// whatever the settlement outcome.
    ///
    /// Settlement is not atomic across the two ledgers. If the buyer has
    /// confirmed and paid but crediting the sale here fails, the result is
    /// [`Settlement::Failed`] even though the buyer's money is already gone
    /// and the buyer holds the item; nothing is credited to us.
    pub async fn close_auction(self: &Arc<Self>, auction_id: &str) -> AgoraResult<Settlement> {
        let now = self.now();
        let (closed, winner, peers) = {
            let mut state = self.state.lock();
            let (closed, winner) = state.registry.close_owned(auction_id, now)?;
            (closed, winner, state.peers.keys())
        };
        let item_id = closed.item_id.clone();

        self.broadcast(peers, Method::CloseAuction, AuctionBody { auction: closed })
            .await;

        let settlement = match winner {
            Some(bid) if bid.bidder_public_key != self.public_key() => {
                match self.exchange(bid.bidder_public_key, &item_id, bid.value).await {
                    Ok(true) => Settlement::Sold {
                        buyer: bid.bidder_public_key,
                        price: bid.value,
                    },
                    Ok(false) => Settlement::Failed {
                        buyer: bid.bidder_public_key,
                        price: bid.value,
                        reason: "buyer declined the exchange".into(),
                    },
                    Err(e) => Settlement::Failed {
                        buyer: bid.bidder_public_key,
                        price: bid.value,
                        reason: e.to_string(),
                    },
                }
            }
            _ => Settlement::Unsold,
        };

        let settlement = {
            let mut state = self.state.lock();
            state.registry.remove(auction_id);
            match settlement {
                Settlement::Sold { buyer, price } => {
                    match state.ledger.complete_sale(&item_id, price) {
                        Ok(_) => Settlement::Sold { buyer, price },
                        Err(e) => {
                            error!(
                                "[{}] {} paid {} for {} but the sale could not be booked: {}",
                                self.display_id(),
                                buyer.short(),
                                price,
                                item_id,
                                e
                            );
                            Settlement::Failed {
                                buyer,
                                price,
                                reason: e.to_string(),
                            }
                        }
                    }
                }
                other => other,
            }
        };
        self.forget_auction(auction_id).await;

        match &settlement {
            Settlement::Sold { buyer, price } => info!(
                "[{}] sold {} to {} for {}",
                self.display_id(),
                item_id,
                buyer.short(),
                price
            ),
            Settlement::Unsold => info!("[{}] closed {} without a sale", self.display_id(), auction_id),
            Settlement::Failed { buyer, reason, .. } => warn!(
                "[{}] settlement of {} with {} failed: {}",
                self.display_id(),
                auction_id,
                buyer.short(),
                reason
            ),
        }
        Ok(settlement)
    }

    /// Ask `buyer` to pay `price` for `item_id`. Returns the buyer's confirmation.
    async fn exchange(&self, buyer: PeerKey, item_id: &str, price: u64) -> AgoraResult<bool> {
        let body = ExchangeBody {
            item: item_id.to_string(),
            price,
        };
        let response: Response<ExchangeReply> = self.send(&buyer, Method::Exchange, body).await?;
        Ok(response.body.transaction_confirmed)
    }

    /// Tell `peer` we are leaving and forget it once it acknowledges.
    pub async fn say_farewell(&self, peer: PeerKey) -> AgoraResult<()> {
        let _: Response<Empty> = self.send(&peer, Method::Farewell, Empty {}).await?;
        self.state.lock().peers.remove(&peer);
        Ok(())
    }
}
