use crate::identity::PeerKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a participant should do with a peer on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAction {
    /// Handshake complete: pull its auction view.
    RequestAuctions,
    /// Both greets happened: mark confirmed locally.
    Confirm,
    /// We have not greeted it yet.
    Greet,
    /// We greeted; waiting for its greet.
    Wait,
}

/// Handshake state for one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub public_key: PeerKey,
    /// Label the peer reported about itself, if it has said anything yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    pub confirmed: bool,
    pub greet_sent: bool,
    pub greet_received: bool,
}

impl PeerRecord {
    pub const fn new(public_key: PeerKey) -> Self {
        Self {
            public_key,
            display_id: None,
            confirmed: false,
            greet_sent: false,
            greet_received: false,
        }
    }

    pub const fn next_action(&self) -> PeerAction {
        if self.confirmed {
            PeerAction::RequestAuctions
        } else if self.greet_sent && self.greet_received {
            PeerAction::Confirm
        } else if !self.greet_sent {
            PeerAction::Greet
        } else {
            PeerAction::Wait
        }
    }

    pub fn label(&self) -> String {
        self.display_id
            .clone()
            .unwrap_or_else(|| self.public_key.short())
    }
}

/// Known peers keyed by public key.
///
/// Records are only removed by a farewell exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDirectory {
    peers: BTreeMap<PeerKey, PeerRecord>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PeerKey) -> Option<&PeerRecord> {
        self.peers.get(key)
    }

    pub fn contains(&self, key: &PeerKey) -> bool {
        self.peers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn keys(&self) -> Vec<PeerKey> {
        self.peers.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    pub fn confirmed_count(&self) -> usize {
        self.peers.values().filter(|p| p.confirmed).count()
    }

    /// Add an unconfirmed record unless one exists. Returns whether it was added.
    pub fn insert_if_absent(&mut self, key: PeerKey) -> bool {
        if self.peers.contains_key(&key) {
            return false;
        }
        self.peers.insert(key, PeerRecord::new(key));
        true
    }

    /// Our greet to `key` was answered.
    pub fn mark_greet_sent(&mut self, key: PeerKey, display_id: Option<String>) {
        let record = self.peers.entry(key).or_insert_with(|| PeerRecord::new(key));
        record.greet_sent = true;
        if display_id.is_some() {
            record.display_id = display_id;
        }
    }

    /// `key` greeted us.
    pub fn mark_greet_received(&mut self, key: PeerKey, display_id: Option<String>) {
        let record = self.peers.entry(key).or_insert_with(|| PeerRecord::new(key));
        record.greet_received = true;
        if display_id.is_some() {
            record.display_id = display_id;
        }
    }

    /// Confirm `key` if both greets happened. Returns true only on the
    /// transition to confirmed.
    pub fn confirm_if_ready(&mut self, key: &PeerKey) -> bool {
        match self.peers.get_mut(key) {
            Some(record) if !record.confirmed && record.greet_sent && record.greet_received => {
                record.confirmed = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, key: &PeerKey) -> Option<PeerRecord> {
        self.peers.remove(key)
    }

    /// Next action for every peer, in key order.
    pub fn planned_actions(&self) -> Vec<(PeerKey, PeerAction)> {
        self.peers
            .iter()
            .map(|(key, record)| (*key, record.next_action()))
            .collect()
    }
}
