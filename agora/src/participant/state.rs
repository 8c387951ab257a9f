use crate::marketplace::{AuctionRegistry, Ledger, PeerDirectory};
use serde::{Deserialize, Serialize};

/// Everything one participant knows, guarded as a single unit.
///
/// Handlers and tick steps take the lock, mutate, and release it before
/// any network call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    pub ledger: Ledger,
    pub peers: PeerDirectory,
    pub registry: AuctionRegistry,
}

impl ParticipantState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            peers: PeerDirectory::new(),
            registry: AuctionRegistry::new(),
        }
    }
}
