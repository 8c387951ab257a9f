//! Mock message transport for testing.

use crate::error::{AgoraError, AgoraResult};
use crate::identity::PeerKey;
use crate::protocol::{Method, SignedEnvelope};
use crate::traits::{MessageHandler, MessageTransport, PeerEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub peer: PeerKey,
    pub method: Method,
    /// Verified JSON body, `Null` if the envelope did not verify.
    pub body: serde_json::Value,
    pub sequence_number: u64,
}

/// Transport that records requests and answers them with canned bytes.
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<RwLock<Vec<RecordedRequest>>>,
    responses: Arc<RwLock<HashMap<Method, Vec<u8>>>>,
    failing_peers: Arc<RwLock<HashSet<PeerKey>>>,
    listeners: Arc<RwLock<HashMap<PeerKey, Arc<dyn MessageHandler>>>>,
    counter: Arc<AtomicU64>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `method` request with `response`.
    pub fn respond_with(&self, method: Method, response: Vec<u8>) {
        self.responses.write().insert(method, response);
    }

    /// Fail every request addressed to `peer`.
    pub fn fail_peer(&self, peer: PeerKey) {
        self.failing_peers.write().insert(peer);
    }

    pub fn sent_requests(&self) -> Vec<RecordedRequest> {
        self.sent.read().clone()
    }

    pub fn requests_for(&self, method: Method) -> Vec<RecordedRequest> {
        self.sent
            .read()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.sent.read().len()
    }

    pub fn clear(&self) {
        self.sent.write().clear();
    }

    pub fn is_listening(&self, key: &PeerKey) -> bool {
        self.listeners.read().contains_key(key)
    }

    /// Deliver a discovery event to the endpoint listening as `key`.
    pub fn emit(&self, key: &PeerKey, event: PeerEvent) {
        let handler = self.listeners.read().get(key).cloned();
        if let Some(handler) = handler {
            handler.peer_event(event);
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("sent", &self.sent.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn request(
        &self,
        peer: &PeerKey,
        method: Method,
        payload: Vec<u8>,
    ) -> AgoraResult<Vec<u8>> {
        let body = SignedEnvelope::verify_and_unwrap(&payload)
            .ok()
            .and_then(|(json, _)| serde_json::from_slice(&json).ok())
            .unwrap_or(serde_json::Value::Null);
        self.sent.write().push(RecordedRequest {
            peer: *peer,
            method,
            body,
            sequence_number: self.counter.fetch_add(1, Ordering::SeqCst),
        });

        if self.failing_peers.read().contains(peer) {
            return Err(AgoraError::Network("simulated send failure".into()));
        }
        self.responses
            .read()
            .get(&method)
            .cloned()
            .ok_or_else(|| AgoraError::Network(format!("no canned response for {method}")))
    }

    async fn listen(&self, key: PeerKey, handler: Arc<dyn MessageHandler>) -> AgoraResult<()> {
        self.listeners.write().insert(key, handler);
        Ok(())
    }

    async fn close(&self, key: &PeerKey) -> AgoraResult<()> {
        self.listeners
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AgoraError::NotFound(format!("no listener for {}", key.short())))
    }
}
