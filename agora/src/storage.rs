//! Checkpoint encoding and the file-backed [`StateStore`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::config::MAX_CHECKPOINT_SIZE;
use crate::error::{AgoraError, AgoraResult};
use crate::identity::PeerKey;
use crate::participant::ParticipantState;
use crate::traits::StateStore;
use crate::util::cbor_from_limited_reader;

/// Full durable image of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub public_key: PeerKey,
    pub display_id: String,
    pub saved_at: u64,
    pub state: ParticipantState,
}

/// Encode a checkpoint value as CBOR.
pub fn encode<T: Serialize>(value: &T) -> AgoraResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| AgoraError::Serialization(format!("CBOR serialization failed: {e}")))?;
    Ok(buf)
}

/// Decode a checkpoint value, refusing oversized input.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> AgoraResult<T> {
    cbor_from_limited_reader(data, MAX_CHECKPOINT_SIZE)
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> AgoraResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            AgoraError::Storage(format!("cannot create {}: {e}", root.display()))
        })?;
        debug!("file store at {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> AgoraResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(AgoraError::InvalidArgument(format!("invalid store key {key:?}")));
        }
        Ok(self.root.join(format!("{key}.cbor")))
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, key: &str) -> AgoraResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AgoraError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AgoraResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("cbor.tmp");
        tokio::fs::write(&tmp, &value)
            .await
            .map_err(|e| AgoraError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AgoraError::Storage(format!("rename to {}: {e}", path.display())))
    }

    async fn delete(&self, key: &str) -> AgoraResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AgoraError::Storage(format!("remove {}: {e}", path.display()))),
        }
    }
}
