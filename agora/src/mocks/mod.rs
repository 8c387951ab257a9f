//! Mock implementations of the collaborator traits for testing.

pub mod random;
pub mod store;
pub mod time;
pub mod transport;

pub use random::MockRandom;
pub use store::MockStore;
pub use time::MockTime;
pub use transport::{MockTransport, RecordedRequest};
