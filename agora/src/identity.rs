//! Participant identity: Ed25519 key pair, public key type and random IDs.

use crate::config::{DISPLAY_ID_BYTES, OBJECT_ID_BYTES};
use crate::error::{AgoraError, AgoraResult};
use crate::traits::RandomSource;
use data_encoding::BASE64URL_NOPAD;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A participant's public key. Uniquely identifies a peer.
///
/// Serialized as unpadded URL-safe base64 so it can key JSON maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey([u8; 32]);

impl PeerKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First characters of the encoded key, for log lines.
    pub fn short(&self) -> String {
        let encoded = self.to_string();
        encoded.chars().take(8).collect()
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64URL_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerKey({})", self.short())
    }
}

impl FromStr for PeerKey {
    type Err = AgoraError;

    fn from_str(s: &str) -> AgoraResult<Self> {
        let bytes = BASE64URL_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| AgoraError::InvalidArgument(format!("Invalid peer key encoding: {e}")))?;
        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AgoraError::InvalidArgument(format!(
                "Invalid peer key length: expected 32, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl Serialize for PeerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A participant's key pair plus its human-readable label.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    public_key: PeerKey,
    display_id: String,
}

impl Identity {
    pub fn from_seed(seed: [u8; 32], display_id: impl Into<String>) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = PeerKey(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
            display_id: display_id.into(),
        }
    }

    pub const fn public_key(&self) -> PeerKey {
        self.public_key
    }

    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("display_id", &self.display_id)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Short random label for log output.
pub fn random_display_id<R: RandomSource + ?Sized>(random: &R) -> String {
    random_id(random, DISPLAY_ID_BYTES)
}

/// Random URL-safe identifier for auctions and items.
pub fn random_object_id<R: RandomSource + ?Sized>(random: &R) -> String {
    random_id(random, OBJECT_ID_BYTES)
}

fn random_id<R: RandomSource + ?Sized>(random: &R, len: usize) -> String {
    let mut bytes = vec![0u8; len];
    random.fill_bytes(&mut bytes);
    BASE64URL_NOPAD.encode(&bytes)
}
