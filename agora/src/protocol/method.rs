use crate::error::AgoraError;
use std::fmt;
use std::str::FromStr;

/// Message names understood by every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Greet,
    RequestAuction,
    OpenAuction,
    CloseAuction,
    Bid,
    Exchange,
    Farewell,
}

impl Method {
    pub const ALL: [Self; 7] = [
        Self::Greet,
        Self::RequestAuction,
        Self::OpenAuction,
        Self::CloseAuction,
        Self::Bid,
        Self::Exchange,
        Self::Farewell,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::RequestAuction => "request-auction",
            Self::OpenAuction => "open-auction",
            Self::CloseAuction => "close-auction",
            Self::Bid => "bid",
            Self::Exchange => "exchange",
            Self::Farewell => "farewell",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AgoraError::InvalidArgument(format!("unknown method {s:?}")))
    }
}
