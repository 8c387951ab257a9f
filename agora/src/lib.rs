pub mod config;
pub mod error;
pub mod identity;
pub mod marketplace;
pub mod net;
pub mod participant;
pub mod protocol;
pub mod scheduler;
pub mod storage;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use config::*;
pub use error::{AgoraError, AgoraResult, ErrorCode};
pub use identity::{Identity, PeerKey};
pub use marketplace::{
    Auction, AuctionId, AuctionRegistry, Bid, InventoryItem, Ledger, PeerDirectory, PeerRecord,
};
pub use net::LocalNetwork;
pub use participant::{
    LifecycleState, Participant, ParticipantState, ParticipantSummary, Settlement, TickOutcome,
};
pub use protocol::Method;
pub use scheduler::Scheduler;
pub use storage::FileStore;
pub use traits::{
    MemoryStore, MessageHandler, MessageTransport, PeerEvent, RandomSource, StateStore,
    SystemTimeProvider, ThreadRng, TimeProvider,
};
