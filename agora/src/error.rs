use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable codes carried by protocol error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The receiver is not the auctioneer of the named auction.
    #[serde(rename = "ERR_AUCTION_WRONG_AUCTIONEER")]
    WrongAuctioneer,
    /// The receiver has no record of the named auction.
    #[serde(rename = "ERR_AUCTION_UNKNOWN")]
    UnknownAuction,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WrongAuctioneer => "ERR_AUCTION_WRONG_AUCTIONEER",
            Self::UnknownAuction => "ERR_AUCTION_UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-specific error types for the auction library.
#[derive(Debug, thiserror::Error)]
pub enum AgoraError {
    /// A caller passed something that can never succeed (missing key, bad payload shape).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A remote participant answered with a structured protocol error.
    #[error("Protocol error {code}: {message}")]
    Protocol { code: ErrorCode, message: String },

    #[error("Network operation failed: {0}")]
    Network(String),

    #[error("Settlement failed: {0}")]
    Settlement(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgoraError {
    /// Returns the protocol error code if this error came from a remote error response.
    pub const fn protocol_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AgoraError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON: {e}"))
    }
}

/// Convenience type alias.
pub type AgoraResult<T> = Result<T, AgoraError>;
