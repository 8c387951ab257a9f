//! In-process network joining participants that share one topic.
//!
//! Every endpoint that starts listening is announced to all others, and all
//! others to it, mirroring a swarm where everyone on the topic connects to
//! everyone else.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{AgoraError, AgoraResult};
use crate::identity::PeerKey;
use crate::protocol::Method;
use crate::traits::{MessageHandler, MessageTransport, PeerEvent};

#[derive(Default)]
struct Endpoints {
    handlers: HashMap<PeerKey, Arc<dyn MessageHandler>>,
    partitioned: HashSet<PeerKey>,
}

/// Shared in-memory router. Clones refer to the same network.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    endpoints: Arc<RwLock<Endpoints>>,
    requests: Arc<AtomicU64>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.read().handlers.len()
    }

    pub fn is_listening(&self, key: &PeerKey) -> bool {
        self.endpoints.read().handlers.contains_key(key)
    }

    /// Requests routed so far, including failed ones.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make `key` unreachable until [`heal`](Self::heal) is called.
    pub fn partition(&self, key: PeerKey) {
        self.endpoints.write().partitioned.insert(key);
    }

    pub fn heal(&self, key: &PeerKey) {
        self.endpoints.write().partitioned.remove(key);
    }
}

impl std::fmt::Debug for LocalNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints = self.endpoints.read();
        f.debug_struct("LocalNetwork")
            .field("endpoints", &endpoints.handlers.len())
            .field("partitioned", &endpoints.partitioned.len())
            .finish()
    }
}

#[async_trait]
impl MessageTransport for LocalNetwork {
    async fn request(
        &self,
        peer: &PeerKey,
        method: Method,
        payload: Vec<u8>,
    ) -> AgoraResult<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let handler = {
            let endpoints = self.endpoints.read();
            if endpoints.partitioned.contains(peer) {
                return Err(AgoraError::Network(format!("{} is unreachable", peer.short())));
            }
            endpoints
                .handlers
                .get(peer)
                .cloned()
                .ok_or_else(|| AgoraError::Network(format!("no endpoint for {}", peer.short())))?
        };
        trace!("routing {} to {}", method, peer.short());
        handler.handle(method, payload).await.map_err(|e| {
            AgoraError::Network(format!("{} failed to handle {method}: {e}", peer.short()))
        })
    }

    async fn listen(&self, key: PeerKey, handler: Arc<dyn MessageHandler>) -> AgoraResult<()> {
        let others: Vec<(PeerKey, Arc<dyn MessageHandler>)> = {
            let mut endpoints = self.endpoints.write();
            if endpoints.handlers.contains_key(&key) {
                return Err(AgoraError::InvalidState(format!(
                    "{} is already listening",
                    key.short()
                )));
            }
            let others = endpoints
                .handlers
                .iter()
                .map(|(k, h)| (*k, Arc::clone(h)))
                .collect();
            endpoints.handlers.insert(key, Arc::clone(&handler));
            others
        };

        debug!("{} joined with {} existing endpoints", key.short(), others.len());
        for (other_key, other) in others {
            other.peer_event(PeerEvent::Connected(key));
            handler.peer_event(PeerEvent::Connected(other_key));
        }
        Ok(())
    }

    async fn close(&self, key: &PeerKey) -> AgoraResult<()> {
        let others: Vec<Arc<dyn MessageHandler>> = {
            let mut endpoints = self.endpoints.write();
            if endpoints.handlers.remove(key).is_none() {
                return Err(AgoraError::NotFound(format!("no endpoint for {}", key.short())));
            }
            endpoints.partitioned.remove(key);
            endpoints.handlers.values().cloned().collect()
        };
        debug!("{} left the network", key.short());
        for other in others {
            other.peer_event(PeerEvent::Disconnected(*key));
        }
        Ok(())
    }
}
