//! Request/response messaging and peer discovery abstractions.

use crate::error::AgoraResult;
use crate::identity::PeerKey;
use crate::protocol::Method;
use async_trait::async_trait;
use std::sync::Arc;

/// Connectivity notifications delivered by the discovery layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    /// A peer's address became known (inbound or outbound connection).
    Connected(PeerKey),
    /// The connection to a peer closed.
    Disconnected(PeerKey),
}

/// Server side of an endpoint: answers requests and observes discovery.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Answer one inbound request. `payload` is the raw wire body.
    async fn handle(&self, method: Method, payload: Vec<u8>) -> AgoraResult<Vec<u8>>;

    /// Observe a discovery event. Must not block.
    fn peer_event(&self, event: PeerEvent);
}

/// Abstraction over the request/response transport.
///
/// `listen` registers an endpoint under its public key so the transport can
/// route requests to it and announce it to other endpoints; `close`
/// releases that registration.
#[async_trait]
pub trait MessageTransport: Send + Sync + Clone {
    /// Send a request to `peer` and wait for its response body.
    async fn request(&self, peer: &PeerKey, method: Method, payload: Vec<u8>)
        -> AgoraResult<Vec<u8>>;

    /// Start serving requests addressed to `key`.
    async fn listen(&self, key: PeerKey, handler: Arc<dyn MessageHandler>) -> AgoraResult<()>;

    /// Stop serving `key` and release its resources.
    async fn close(&self, key: &PeerKey) -> AgoraResult<()>;
}
