//! Inbound request handlers, dispatched by method name.
//!
//! Each handler is a plain function over the participant's state. The
//! caller holds the state lock for the duration of one call, so handlers
//! never await and never touch the network.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{AgoraError, AgoraResult, ErrorCode};
use crate::identity::{Identity, PeerKey};
use crate::marketplace::{Auction, Bid};
use crate::participant::ParticipantState;
use crate::protocol::messages::{
    AuctionBody, AuctionsReply, BidBody, BidReply, CloseReply, Empty, ExchangeBody, ExchangeReply,
    ProtocolError,
};
use crate::protocol::{decode_request, encode_response, Method};

/// Per-request data handed to a handler alongside the state.
pub struct HandlerContext<'a> {
    pub identity: &'a Identity,
    pub now: u64,
    /// Verified signer of the request envelope.
    pub signer: PeerKey,
    /// Auctions changed by the handler, to be checkpointed after the lock is released.
    pub dirty: Vec<Auction>,
}

impl<'a> HandlerContext<'a> {
    pub const fn new(identity: &'a Identity, now: u64, signer: PeerKey) -> Self {
        Self {
            identity,
            now,
            signer,
            dirty: Vec::new(),
        }
    }
}

pub type HandlerFn =
    fn(&mut ParticipantState, &mut HandlerContext<'_>, &[u8]) -> AgoraResult<Vec<u8>>;

/// Method name to handler.
#[derive(Clone)]
pub struct HandlerTable {
    handlers: HashMap<Method, HandlerFn>,
}

impl HandlerTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with all seven protocol handlers registered.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(Method::Greet, handle_greet);
        table.register(Method::RequestAuction, handle_request_auction);
        table.register(Method::OpenAuction, handle_open_auction);
        table.register(Method::CloseAuction, handle_close_auction);
        table.register(Method::Bid, handle_bid);
        table.register(Method::Exchange, handle_exchange);
        table.register(Method::Farewell, handle_farewell);
        table
    }

    pub fn register(&mut self, method: Method, handler: HandlerFn) {
        self.handlers.insert(method, handler);
    }

    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<_> = self.handlers.keys().copied().collect();
        methods.sort();
        methods
    }

    pub fn dispatch(
        &self,
        method: Method,
        state: &mut ParticipantState,
        ctx: &mut HandlerContext<'_>,
        body: &[u8],
    ) -> AgoraResult<Vec<u8>> {
        let handler = self
            .handlers
            .get(&method)
            .ok_or_else(|| AgoraError::NotFound(format!("no handler for {method}")))?;
        handler(state, ctx, body)
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("methods", &self.methods())
            .finish()
    }
}

fn reject_self(ctx: &HandlerContext<'_>) -> AgoraResult<()> {
    if ctx.signer == ctx.identity.public_key() {
        return Err(AgoraError::InvalidArgument(
            "participant addressed a request to itself".into(),
        ));
    }
    Ok(())
}

fn handle_greet(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    reject_self(ctx)?;
    let request = decode_request::<Empty>(&ctx.signer, body)?;
    let header = request.header;
    let first_contact = !state.peers.contains(&header.requester_public_key);
    state
        .peers
        .mark_greet_received(header.requester_public_key, Some(header.requester_id.clone()));
    debug!(
        "[{}] greeted by {} (first contact: {})",
        ctx.identity.display_id(),
        header.requester_id,
        first_contact
    );
    encode_response(ctx.identity, ctx.now, header, Empty {})
}

fn handle_request_auction(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    let request = decode_request::<Empty>(&ctx.signer, body)?;
    let reply = AuctionsReply {
        known_auctions: state.registry.known().clone(),
    };
    encode_response(ctx.identity, ctx.now, request.header, reply)
}

fn handle_open_auction(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    reject_self(ctx)?;
    let request = decode_request::<AuctionBody>(&ctx.signer, body)?;
    let mut auction = request.body.auction;
    auction.auctioneer_public_key = request.header.requester_public_key;
    let auction_id = auction.auction_id.clone();
    if state.registry.insert_remote(auction, &ctx.identity.public_key()) {
        info!(
            "[{}] learned of auction {} from {}",
            ctx.identity.display_id(),
            auction_id,
            request.header.requester_id
        );
    } else {
        warn!(
            "[{}] ignoring open-auction for {} which we run",
            ctx.identity.display_id(),
            auction_id
        );
    }
    encode_response(ctx.identity, ctx.now, request.header, Empty {})
}

fn handle_close_auction(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    let request = decode_request::<AuctionBody>(&ctx.signer, body)?;
    let auction_id = request.body.auction.auction_id;
    let requester = request.header.requester_public_key;

    let local = state
        .registry
        .get(&auction_id)
        .map(|auction| (state.registry.is_owned(&auction_id), auction.auctioneer_public_key));

    let reply = match local {
        None => CloseReply {
            auction_deleted: false,
            error: Some(ProtocolError::new(
                ErrorCode::UnknownAuction,
                format!("auction {auction_id} is unknown"),
            )),
        },
        Some((owned, auctioneer)) if owned || auctioneer != requester => CloseReply {
            auction_deleted: false,
            error: Some(ProtocolError::new(
                ErrorCode::WrongAuctioneer,
                format!("auction {auction_id} is run by {auctioneer}"),
            )),
        },
        Some(_) => {
            state.registry.remove(&auction_id);
            debug!("[{}] dropped closed auction {}", ctx.identity.display_id(), auction_id);
            CloseReply {
                auction_deleted: true,
                error: None,
            }
        }
    };
    encode_response(ctx.identity, ctx.now, request.header, reply)
}

fn handle_bid(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    let request = decode_request::<BidBody>(&ctx.signer, body)?;
    let header = request.header;
    let BidBody { auction_id, value } = request.body;
    let bid = Bid::new(header.request_time, header.requester_public_key, value);

    let reply = BidReply::from_decision(
        &auction_id,
        state
            .registry
            .record_bid(&auction_id, bid, &ctx.identity.public_key()),
    );
    match (&reply.auction, reply.best_bid) {
        (Some(auction), Some(best)) => {
            debug!(
                "[{}] bid {} from {} on {} (best: {})",
                ctx.identity.display_id(),
                value,
                header.requester_id,
                auction_id,
                best
            );
            ctx.dirty.push(auction.clone());
        }
        _ => debug!(
            "[{}] rejected bid from {} on {}",
            ctx.identity.display_id(),
            header.requester_id,
            auction_id
        ),
    }
    encode_response(ctx.identity, ctx.now, header, reply)
}

fn handle_exchange(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    reject_self(ctx)?;
    let request = decode_request::<ExchangeBody>(&ctx.signer, body)?;
    let ExchangeBody { item, price } = request.body;

    let transaction_confirmed = match state.ledger.complete_purchase(&item, price, ctx.now) {
        Ok(()) => {
            info!(
                "[{}] bought {} from {} for {} (money now {})",
                ctx.identity.display_id(),
                item,
                request.header.requester_id,
                price,
                state.ledger.money()
            );
            true
        }
        Err(AgoraError::Settlement(reason)) => {
            warn!("[{}] declined exchange of {}: {}", ctx.identity.display_id(), item, reason);
            false
        }
        Err(e) => return Err(e),
    };
    encode_response(
        ctx.identity,
        ctx.now,
        request.header,
        ExchangeReply {
            transaction_confirmed,
        },
    )
}

fn handle_farewell(
    state: &mut ParticipantState,
    ctx: &mut HandlerContext<'_>,
    body: &[u8],
) -> AgoraResult<Vec<u8>> {
    let request = decode_request::<Empty>(&ctx.signer, body)?;
    if state.peers.remove(&request.header.requester_public_key).is_some() {
        info!(
            "[{}] {} said farewell",
            ctx.identity.display_id(),
            request.header.requester_id
        );
    }
    encode_response(ctx.identity, ctx.now, request.header, Empty {})
}
