use bincode::Options;
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};

use crate::config::MAX_ENVELOPE_SIZE;
use crate::error::{AgoraError, AgoraResult};
use crate::identity::{Identity, PeerKey};

/// Deserialize bincode with a size limit to prevent OOM from crafted payloads.
fn bincode_deserialize_limited<T: serde::de::DeserializeOwned>(
    data: &[u8],
) -> Result<T, bincode::Error> {
    bincode::options()
        .with_limit(MAX_ENVELOPE_SIZE)
        .deserialize(data)
}

/// Signed wrapper around every request body.
///
/// `payload` is the JSON request. The sender signs it with its identity
/// key; the receiver verifies before parsing, so `requesterPublicKey`
/// inside the payload can be checked against the actual signer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    /// Ed25519 verifying key bytes (the signer's identity).
    pub signer: [u8; 32],
    /// Ed25519 signature over `payload` (64 bytes).
    pub signature: Vec<u8>,
}

impl SignedEnvelope {
    pub fn sign(payload: Vec<u8>, identity: &Identity) -> Self {
        let signing_key = identity.signing_key();
        let signature = signing_key.sign(&payload);
        Self {
            payload,
            signer: signing_key.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Verify the signature and return the payload plus the signer's key.
    pub fn verify_and_unwrap(data: &[u8]) -> AgoraResult<(Vec<u8>, PeerKey)> {
        let envelope: Self = bincode_deserialize_limited(data).map_err(|e| {
            AgoraError::Serialization(format!("Failed to deserialize signed envelope: {e}"))
        })?;

        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&envelope.signer)
            .map_err(|e| AgoraError::Crypto(format!("Invalid signer public key: {e}")))?;
        let sig_bytes: [u8; 64] = envelope.signature.as_slice().try_into().map_err(|_| {
            AgoraError::Crypto(format!(
                "Invalid signature length: expected 64, got {}",
                envelope.signature.len()
            ))
        })?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        verifying_key
            .verify(&envelope.payload, &signature)
            .map_err(|e| AgoraError::Crypto(format!("Signature verification failed: {e}")))?;

        Ok((envelope.payload, PeerKey::from_bytes(envelope.signer)))
    }

    pub fn to_bytes(&self) -> AgoraResult<Vec<u8>> {
        bincode::options()
            .with_limit(MAX_ENVELOPE_SIZE)
            .serialize(self)
            .map_err(|e| {
                AgoraError::Serialization(format!("Failed to serialize signed envelope: {e}"))
            })
    }
}
