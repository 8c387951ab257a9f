//! JSON request and response bodies for the seven protocol methods.
//!
//! Every request carries a [`RequestHeader`]; every response echoes that
//! header and adds a [`ResponseHeader`]. Method-specific fields are
//! flattened next to the headers.

use crate::error::{AgoraError, AgoraResult, ErrorCode};
use crate::identity::PeerKey;
use crate::marketplace::{Auction, AuctionId, BidDecision, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    pub request_time: u64,
    #[serde(rename = "requesterID")]
    pub requester_id: String,
    pub requester_public_key: PeerKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    pub respond_time: u64,
    #[serde(rename = "responderID")]
    pub responder_id: String,
    pub responder_public_key: PeerKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request<B> {
    #[serde(flatten)]
    pub header: RequestHeader,
    #[serde(flatten)]
    pub body: B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response<B> {
    #[serde(flatten)]
    pub request: RequestHeader,
    #[serde(flatten)]
    pub responder: ResponseHeader,
    #[serde(flatten)]
    pub body: B,
}

/// Body of methods without extra fields (greet, request-auction, farewell, acks).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Structured error carried inside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn into_error(self) -> AgoraError {
        AgoraError::Protocol {
            code: self.code,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionsReply {
    pub known_auctions: BTreeMap<AuctionId, Auction>,
}

/// open-auction and close-auction requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBody {
    pub auction: Auction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReply {
    #[serde(default)]
    pub auction_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

impl CloseReply {
    pub fn into_result(self) -> AgoraResult<bool> {
        match self.error {
            Some(error) => Err(error.into_error()),
            None => Ok(self.auction_deleted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidBody {
    #[serde(rename = "auctionID")]
    pub auction_id: AuctionId,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction: Option<Auction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_bid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub see_auctioneer: Option<PeerKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

impl BidReply {
    pub fn from_decision(auction_id: &str, decision: BidDecision) -> Self {
        match decision {
            BidDecision::Accepted { auction, best_bid } => Self {
                auction: Some(auction),
                best_bid: Some(best_bid),
                ..Self::default()
            },
            BidDecision::Rejected {
                code,
                see_auctioneer,
                auction,
            } => {
                let message = match (code, see_auctioneer) {
                    (ErrorCode::WrongAuctioneer, Some(key)) => {
                        format!("auction {auction_id} is run by {key}")
                    }
                    _ => format!("auction {auction_id} is unknown"),
                };
                Self {
                    auction,
                    best_bid: None,
                    see_auctioneer,
                    error: Some(ProtocolError::new(code, message)),
                }
            }
        }
    }

    /// The auctioneer's updated auction and whether our bid leads.
    pub fn into_result(self) -> AgoraResult<(Auction, bool)> {
        if let Some(error) = self.error {
            return Err(error.into_error());
        }
        let auction = self
            .auction
            .ok_or_else(|| AgoraError::Serialization("bid reply without auction".into()))?;
        Ok((auction, self.best_bid.unwrap_or(false)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeBody {
    pub item: ItemId,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeReply {
    pub transaction_confirmed: bool,
}
