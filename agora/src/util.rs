//! Utility functions shared across the crate.

use crate::error::{AgoraError, AgoraResult};
use serde::de::DeserializeOwned;

/// Deserialize CBOR data with a size limit to prevent oversized payloads.
pub fn cbor_from_limited_reader<T: DeserializeOwned>(
    data: &[u8],
    max_bytes: usize,
) -> AgoraResult<T> {
    if data.len() > max_bytes {
        return Err(AgoraError::Storage(format!(
            "CBOR payload too large: {} bytes (max {})",
            data.len(),
            max_bytes
        )));
    }
    ciborium::from_reader(data)
        .map_err(|e| AgoraError::Serialization(format!("CBOR deserialization failed: {e}")))
}
