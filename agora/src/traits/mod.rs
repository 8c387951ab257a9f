//! Trait abstractions over the participant's external collaborators.
//!
//! The protocol core only talks to the outside world through these traits,
//! so it runs the same against the in-process network, mocks, or a real
//! transport.

pub mod random;
pub mod store;
pub mod time;
pub mod transport;

pub use random::{RandomSource, ThreadRng};
pub use store::{MemoryStore, StateStore};
pub use time::{SystemTimeProvider, TimeProvider};
pub use transport::{MessageHandler, MessageTransport, PeerEvent};
