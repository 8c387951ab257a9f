//! Multi-participant harness over the in-process network.

use std::sync::Arc;

use agora::mocks::{MockRandom, MockStore, MockTime};
use agora::{InventoryItem, LocalNetwork, Participant, ParticipantConfig, PeerKey};

pub type SimParticipant = Participant<LocalNetwork, MockTime, MockRandom, MockStore>;

/// Starting endowment of one harness participant.
pub struct Endowment {
    pub name: &'static str,
    pub money: u64,
    pub items: Vec<InventoryItem>,
}

impl Endowment {
    pub fn new(name: &'static str, money: u64) -> Self {
        Self {
            name,
            money,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item_id: &str, base_value: u64) -> Self {
        self.items.push(InventoryItem::new(item_id, base_value));
        self
    }
}

pub struct Harness {
    pub network: LocalNetwork,
    pub time: MockTime,
    participants: Vec<Arc<SimParticipant>>,
    stores: Vec<MockStore>,
}

#[allow(dead_code)]
impl Harness {
    /// Create, initialise and start every participant in `endowments`.
    pub async fn new(endowments: Vec<Endowment>) -> Self {
        let mut harness = Self {
            network: LocalNetwork::new(),
            time: MockTime::new(1_000_000),
            participants: Vec::new(),
            stores: Vec::new(),
        };
        for endowment in endowments {
            harness.join(endowment).await;
        }
        harness
    }

    /// Add one more LIVING participant to the network.
    pub async fn join(&mut self, endowment: Endowment) -> Arc<SimParticipant> {
        let participant = self.join_initialised(endowment).await;
        participant.start_living().unwrap();
        participant
    }

    /// Add a participant that listens but has not started living.
    pub async fn join_initialised(&mut self, endowment: Endowment) -> Arc<SimParticipant> {
        let index = self.participants.len();
        let config = ParticipantConfig::new()
            .with_display_id(endowment.name)
            .with_seed([index as u8 + 1; 32])
            .with_money(endowment.money)
            .with_inventory(endowment.items);
        let store = MockStore::new();
        let participant = Arc::new(Participant::new(
            config,
            self.network.clone(),
            self.time.clone(),
            MockRandom::new(index as u64 + 1),
            store.clone(),
        ));
        participant.initialise().await.unwrap();
        self.participants.push(Arc::clone(&participant));
        self.stores.push(store);
        participant
    }

    pub fn get(&self, index: usize) -> &Arc<SimParticipant> {
        &self.participants[index]
    }

    /// Checkpoint store of one participant.
    pub fn store(&self, index: usize) -> &MockStore {
        &self.stores[index]
    }

    pub fn key(&self, index: usize) -> PeerKey {
        self.participants[index].public_key()
    }

    pub fn all(&self) -> &[Arc<SimParticipant>] {
        &self.participants
    }

    /// Advance the shared clock by one second.
    pub fn step(&self) {
        self.time.advance(1_000);
    }

    /// Sum of every participant's money.
    pub fn total_money(&self) -> u64 {
        self.participants.iter().map(|p| p.summary().money).sum()
    }

    pub fn money(&self, index: usize) -> u64 {
        self.participants[index].summary().money
    }

    pub fn has_item(&self, index: usize, item_id: &str) -> bool {
        self.participants[index].inspect(|s| s.ledger.item(item_id).is_some())
    }

    pub fn knows_auction(&self, index: usize, auction_id: &str) -> bool {
        self.participants[index].inspect(|s| s.registry.get(auction_id).is_some())
    }
}
