//! One round of autonomous behaviour.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::shutdown::ShutdownReport;
use super::{LifecycleState, Participant, ParticipantState, Settlement};
use crate::error::AgoraResult;
use crate::identity::PeerKey;
use crate::marketplace::{AuctionId, MergeStats, PeerAction};
use crate::traits::{MessageTransport, RandomSource, StateStore, TimeProvider};

/// The single auction step a tick takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionAction {
    /// Close an owned auction that drew competing bids.
    Close(AuctionId),
    /// Owned auction with only its opening bid; leave it running.
    Hold(AuctionId),
    /// Bid on someone else's auction.
    Bid(AuctionId),
    /// Put an item up for auction.
    Open,
    Idle,
}

/// What the auction step achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionOutcome {
    Opened(AuctionId),
    NothingToOpen,
    Bid {
        auction_id: AuctionId,
        value: u64,
        best_bid: bool,
    },
    Closed {
        auction_id: AuctionId,
        settlement: Settlement,
    },
    Held(AuctionId),
    Idle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub greeted: usize,
    pub confirmed: usize,
    pub pulled: usize,
    pub merged: MergeStats,
    pub failures: usize,
    pub auction: Option<AuctionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ran(TickReport),
    /// Another tick was still running.
    Skipped,
    /// The participant was not LIVING, so the tick drove shutdown.
    ShutDown(ShutdownReport),
    /// Already DEAD; nothing to do.
    Dead,
}

/// Pick this tick's auction step.
///
/// With two or more known auctions one is chosen uniformly at random:
/// owned ones are closed once they have competing bids, others are bid on.
/// Otherwise an item is put up for auction if there is one.
pub fn choose_action<R: RandomSource + ?Sized>(state: &ParticipantState, random: &R) -> AuctionAction {
    let known = state.registry.known_ids();
    if known.len() >= 2 {
        let Some(auction_id) = random.pick_index(known.len()).and_then(|i| known.get(i)) else {
            return AuctionAction::Idle;
        };
        let auction_id = auction_id.clone();
        if state.registry.is_owned(&auction_id) {
            let competing = state
                .registry
                .get(&auction_id)
                .is_some_and(|auction| auction.has_competing_bids());
            if competing {
                AuctionAction::Close(auction_id)
            } else {
                AuctionAction::Hold(auction_id)
            }
        } else if state.ledger.money() == 0 {
            AuctionAction::Idle
        } else {
            AuctionAction::Bid(auction_id)
        }
    } else if state.ledger.has_items() {
        AuctionAction::Open
    } else {
        AuctionAction::Idle
    }
}

enum TaskResult {
    Greeted(PeerKey, AgoraResult<()>),
    Pulled(PeerKey, AgoraResult<MergeStats>),
    Auction(AgoraResult<AuctionOutcome>),
}

impl<T, C, R, S> Participant<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    /// Run one tick.
    ///
    /// Each peer gets its next handshake step or an auction pull, and one
    /// auction step is taken; all of these run concurrently and are awaited
    /// together. Overlapping calls are skipped. When the participant is not
    /// LIVING the call runs the shutdown sequence instead.
    pub async fn participate(self: &Arc<Self>) -> TickOutcome {
        let Ok(guard) = self.tick_lock.try_lock() else {
            debug!("[{}] previous tick still running, skipping", self.display_id());
            return TickOutcome::Skipped;
        };

        match self.lifecycle() {
            LifecycleState::Living => {}
            LifecycleState::Dead => return TickOutcome::Dead,
            _ => {
                drop(guard);
                return TickOutcome::ShutDown(self.shutdown().await);
            }
        }

        let mut report = TickReport::default();
        let (peer_actions, action) = {
            let mut state = self.state.lock();
            let mut actions = Vec::new();
            for (peer, action) in state.peers.planned_actions() {
                match action {
                    PeerAction::Confirm => {
                        if state.peers.confirm_if_ready(&peer) {
                            report.confirmed += 1;
                            info!("[{}] confirmed peer {}", self.display_id(), peer.short());
                        }
                    }
                    PeerAction::Wait => {}
                    other => actions.push((peer, other)),
                }
            }
            (actions, choose_action(&state, &self.random))
        };

        let mut tasks = JoinSet::new();
        for (peer, action) in peer_actions {
            let this = Arc::clone(self);
            match action {
                PeerAction::Greet => {
                    tasks.spawn(async move { TaskResult::Greeted(peer, this.greet_peer(peer).await) });
                }
                PeerAction::RequestAuctions => {
                    tasks.spawn(async move {
                        TaskResult::Pulled(peer, this.request_auctions(peer).await)
                    });
                }
                PeerAction::Confirm | PeerAction::Wait => {}
            }
        }
        let this = Arc::clone(self);
        tasks.spawn(async move { TaskResult::Auction(this.run_auction_action(action).await) });

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskResult::Greeted(_, Ok(()))) => report.greeted += 1,
                Ok(TaskResult::Pulled(_, Ok(stats))) => {
                    report.pulled += 1;
                    report.merged.adopted += stats.adopted;
                    report.merged.replaced += stats.replaced;
                    report.merged.kept += stats.kept;
                }
                Ok(TaskResult::Greeted(peer, Err(e)) | TaskResult::Pulled(peer, Err(e))) => {
                    report.failures += 1;
                    warn!("[{}] request to {} failed: {}", self.display_id(), peer.short(), e);
                }
                Ok(TaskResult::Auction(Ok(outcome))) => report.auction = Some(outcome),
                Ok(TaskResult::Auction(Err(e))) => {
                    report.failures += 1;
                    warn!("[{}] auction step failed: {}", self.display_id(), e);
                }
                Err(e) => {
                    report.failures += 1;
                    error!("[{}] tick task panicked: {}", self.display_id(), e);
                }
            }
        }

        self.checkpoint().await;
        drop(guard);
        TickOutcome::Ran(report)
    }

    async fn run_auction_action(self: Arc<Self>, action: AuctionAction) -> AgoraResult<AuctionOutcome> {
        match action {
            AuctionAction::Close(auction_id) => {
                let settlement = self.close_auction(&auction_id).await?;
                Ok(AuctionOutcome::Closed {
                    auction_id,
                    settlement,
                })
            }
            AuctionAction::Hold(auction_id) => Ok(AuctionOutcome::Held(auction_id)),
            AuctionAction::Bid(auction_id) => {
                let (value, best_bid) = self.place_random_bid(&auction_id).await?;
                Ok(AuctionOutcome::Bid {
                    auction_id,
                    value,
                    best_bid,
                })
            }
            AuctionAction::Open => Ok(match self.open_auction().await? {
                Some(auction_id) => AuctionOutcome::Opened(auction_id),
                None => AuctionOutcome::NothingToOpen,
            }),
            AuctionAction::Idle => Ok(AuctionOutcome::Idle),
        }
    }
}
