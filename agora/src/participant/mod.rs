//! An autonomous auction participant.
//!
//! [`Participant`] owns one identity, one ledger, one peer directory and one
//! auction registry, all behind a single lock. It answers the seven
//! protocol methods as a [`MessageHandler`] and acts on its own once per
//! tick (see `tick.rs`).
//!
//! # Locking
//!
//! 1. `tick_lock` (async) serializes ticks and shutdown.
//! 2. `lifecycle` guards the lifecycle state.
//! 3. `state` guards ledger, peers and registry.
//!
//! `lifecycle` and `state` are synchronous locks and are never held across
//! an `.await`.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{
    initial_base_value, initial_money, store_keys, ParticipantConfig, INITIAL_ITEM_COUNT,
};
use crate::error::{AgoraError, AgoraResult};
use crate::identity::{random_display_id, random_object_id, Identity, PeerKey};
use crate::marketplace::{Auction, InventoryItem, Ledger};
use crate::protocol::{HandlerContext, HandlerTable, Method, SignedEnvelope};
use crate::storage::{self, ParticipantSnapshot};
use crate::traits::{
    MessageHandler, MessageTransport, PeerEvent, RandomSource, StateStore, TimeProvider,
};

mod lifecycle;
mod outbound;
mod shutdown;
mod state;
mod tick;

pub use lifecycle::LifecycleState;
pub use outbound::Settlement;
pub use shutdown::ShutdownReport;
pub use state::ParticipantState;
pub use tick::{choose_action, AuctionAction, AuctionOutcome, TickOutcome, TickReport};

/// Point-in-time view of a participant for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub display_id: String,
    pub public_key: PeerKey,
    pub lifecycle: LifecycleState,
    pub money: u64,
    pub items: usize,
    pub known_auctions: usize,
    pub owned_auctions: usize,
    pub peers: usize,
    pub confirmed_peers: usize,
}

pub struct Participant<T, C, R, S>
where
    T: MessageTransport,
    C: TimeProvider,
    R: RandomSource,
    S: StateStore,
{
    identity: Identity,
    transport: T,
    time: C,
    random: R,
    store: S,
    handlers: HandlerTable,
    lifecycle: RwLock<LifecycleState>,
    state: Mutex<ParticipantState>,
    tick_lock: tokio::sync::Mutex<()>,
}

impl<T, C, R, S> Participant<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    /// Create a participant in the BORN state.
    ///
    /// Anything `config` leaves unset is derived from a fresh random salt:
    /// the identity seed, the display ID, `(salt[0] + 1) * 1000` money and
    /// three items worth `salt[i + 1] * 5`.
    pub fn new(config: ParticipantConfig, transport: T, time: C, random: R, store: S) -> Self {
        let salt = random.random_bytes_32();
        let seed = config.seed.unwrap_or(salt);
        let display_id = config
            .display_id
            .unwrap_or_else(|| random_display_id(&random));
        let money = config.money.unwrap_or_else(|| initial_money(&salt));
        let inventory = config.inventory.unwrap_or_else(|| {
            (0..INITIAL_ITEM_COUNT)
                .map(|i| InventoryItem::new(random_object_id(&random), initial_base_value(&salt, i)))
                .collect()
        });

        Self {
            identity: Identity::from_seed(seed, display_id),
            transport,
            time,
            random,
            store,
            handlers: HandlerTable::standard(),
            lifecycle: RwLock::new(LifecycleState::Born),
            state: Mutex::new(ParticipantState::new(Ledger::new(money, inventory))),
            tick_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub const fn public_key(&self) -> PeerKey {
        self.identity.public_key()
    }

    pub fn display_id(&self) -> &str {
        self.identity.display_id()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.read()
    }

    /// Run `f` against the current state under the lock.
    pub fn inspect<O>(&self, f: impl FnOnce(&ParticipantState) -> O) -> O {
        let state = self.state.lock();
        f(&state)
    }

    pub fn summary(&self) -> ParticipantSummary {
        let lifecycle = self.lifecycle();
        self.inspect(|state| ParticipantSummary {
            display_id: self.display_id().to_string(),
            public_key: self.public_key(),
            lifecycle,
            money: state.ledger.money(),
            items: state.ledger.item_count(),
            known_auctions: state.registry.known_len(),
            owned_auctions: state.registry.owned_len(),
            peers: state.peers.len(),
            confirmed_peers: state.peers.confirmed_count(),
        })
    }

    /// BORN → INITIALISED: restore any checkpoint and start listening.
    pub async fn initialise(self: &Arc<Self>) -> AgoraResult<()> {
        self.expect_state(LifecycleState::Born)?;

        match self.restore().await {
            Ok(true) => info!("[{}] restored checkpoint", self.display_id()),
            Ok(false) => {}
            Err(e) => warn!("[{}] ignoring unreadable checkpoint: {}", self.display_id(), e),
        }

        let handler: Arc<dyn MessageHandler> = self.clone();
        self.transport.listen(self.public_key(), handler).await?;
        self.transition(LifecycleState::Initialised)?;
        info!(
            "[{}] initialised as {} with {} money and {} items",
            self.display_id(),
            self.public_key().short(),
            self.inspect(|s| s.ledger.money()),
            self.inspect(|s| s.ledger.item_count())
        );
        Ok(())
    }

    /// INITIALISED → LIVING.
    pub fn start_living(&self) -> AgoraResult<()> {
        self.transition(LifecycleState::Living)?;
        info!("[{}] living", self.display_id());
        Ok(())
    }

    fn expect_state(&self, expected: LifecycleState) -> AgoraResult<()> {
        let current = self.lifecycle();
        if current != expected {
            return Err(AgoraError::InvalidState(format!(
                "participant is {current}, expected {expected}"
            )));
        }
        Ok(())
    }

    fn transition(&self, next: LifecycleState) -> AgoraResult<()> {
        let mut lifecycle = self.lifecycle.write();
        if !lifecycle.can_transition_to(next) {
            return Err(AgoraError::InvalidState(format!(
                "cannot move from {} to {next}",
                *lifecycle
            )));
        }
        debug!("[{}] {} -> {}", self.identity.display_id(), *lifecycle, next);
        *lifecycle = next;
        Ok(())
    }

    pub(crate) fn now(&self) -> u64 {
        self.time.now_millis()
    }

    fn snapshot_key(&self) -> String {
        format!("{}.{}", store_keys::SNAPSHOT, self.public_key())
    }

    fn auction_key(&self, auction_id: &str) -> String {
        format!("{}.{}.{}", store_keys::AUCTION, self.public_key(), auction_id)
    }

    /// Write a full snapshot. Failures are logged, never returned.
    pub async fn checkpoint(&self) {
        let snapshot = ParticipantSnapshot {
            public_key: self.public_key(),
            display_id: self.display_id().to_string(),
            saved_at: self.now(),
            state: self.inspect(|state| state.clone()),
        };
        let result = match storage::encode(&snapshot) {
            Ok(bytes) => self.store.put(&self.snapshot_key(), bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("[{}] checkpoint failed: {}", self.display_id(), e);
        }
    }

    async fn persist_auction(&self, auction: &Auction) {
        let result = match storage::encode(auction) {
            Ok(bytes) => self.store.put(&self.auction_key(&auction.auction_id), bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                "[{}] failed to persist auction {}: {}",
                self.display_id(),
                auction.auction_id,
                e
            );
        }
    }

    /// Drop the per-auction record once the auction is gone.
    pub(crate) async fn forget_auction(&self, auction_id: &str) {
        if let Err(e) = self.store.delete(&self.auction_key(auction_id)).await {
            warn!(
                "[{}] failed to delete record of auction {}: {}",
                self.display_id(),
                auction_id,
                e
            );
        }
    }

    /// Replace the in-memory state with the stored snapshot, if there is one.
    ///
    /// Auction records written by the bid handler after the snapshot take
    /// precedence over the snapshot's copy of the same owned auction.
    async fn restore(&self) -> AgoraResult<bool> {
        let Some(bytes) = self.store.get(&self.snapshot_key()).await? else {
            return Ok(false);
        };
        let snapshot: ParticipantSnapshot = storage::decode(&bytes)?;
        if snapshot.public_key != self.public_key() {
            return Err(AgoraError::Storage(format!(
                "snapshot belongs to {}",
                snapshot.public_key.short()
            )));
        }
        let mut state = snapshot.state;
        for auction_id in state.registry.owned_ids() {
            let Some(bytes) = self.store.get(&self.auction_key(&auction_id)).await? else {
                continue;
            };
            let auction: Auction = storage::decode(&bytes)?;
            if state.registry.restore_owned(auction) {
                debug!("[{}] auction {} restored from its record", self.display_id(), auction_id);
            }
        }
        *self.state.lock() = state;
        Ok(true)
    }
}

#[async_trait]
impl<T, C, R, S> MessageHandler for Participant<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    async fn handle(&self, method: Method, payload: Vec<u8>) -> AgoraResult<Vec<u8>> {
        let (json, signer) = SignedEnvelope::verify_and_unwrap(&payload)?;
        let now = self.now();

        let (response, dirty) = {
            let mut state = self.state.lock();
            let mut ctx = HandlerContext::new(&self.identity, now, signer);
            let response = self.handlers.dispatch(method, &mut *state, &mut ctx, &json)?;
            (response, ctx.dirty)
        };

        for auction in &dirty {
            self.persist_auction(auction).await;
        }
        Ok(response)
    }

    fn peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Connected(key) => {
                if key == self.public_key() || self.lifecycle().is_terminating() {
                    return;
                }
                if self.state.lock().peers.insert_if_absent(key) {
                    debug!("[{}] discovered peer {}", self.display_id(), key.short());
                }
            }
            PeerEvent::Disconnected(key) => {
                debug!("[{}] connection to {} closed", self.display_id(), key.short());
            }
        }
    }
}
