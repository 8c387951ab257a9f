//! Concrete transports.

pub mod local;

pub use local::LocalNetwork;
