//! Wire protocol: method names, message bodies, signed envelopes and the
//! inbound handler table.

pub mod envelope;
pub mod handlers;
pub mod messages;
pub mod method;

pub use envelope::SignedEnvelope;
pub use handlers::{HandlerContext, HandlerFn, HandlerTable};
pub use messages::*;
pub use method::Method;

use crate::error::{AgoraError, AgoraResult};
use crate::identity::{Identity, PeerKey};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Build, serialize and sign a request from `identity`.
pub fn encode_request<B: Serialize>(identity: &Identity, now: u64, body: B) -> AgoraResult<Vec<u8>> {
    let request = Request {
        header: RequestHeader {
            request_time: now,
            requester_id: identity.display_id().to_string(),
            requester_public_key: identity.public_key(),
        },
        body,
    };
    let json = serde_json::to_vec(&request)?;
    SignedEnvelope::sign(json, identity).to_bytes()
}

/// Parse a verified request body and check it names its signer as requester.
pub fn decode_request<B: DeserializeOwned>(signer: &PeerKey, json: &[u8]) -> AgoraResult<Request<B>> {
    let request: Request<B> = serde_json::from_slice(json)?;
    if request.header.requester_public_key != *signer {
        return Err(AgoraError::InvalidArgument(format!(
            "request claims requester {} but was signed by {}",
            request.header.requester_public_key.short(),
            signer.short()
        )));
    }
    Ok(request)
}

/// Serialize a response that echoes `request` and identifies `identity`.
pub fn encode_response<B: Serialize>(
    identity: &Identity,
    now: u64,
    request: RequestHeader,
    body: B,
) -> AgoraResult<Vec<u8>> {
    let response = Response {
        request,
        responder: ResponseHeader {
            respond_time: now,
            responder_id: identity.display_id().to_string(),
            responder_public_key: identity.public_key(),
        },
        body,
    };
    Ok(serde_json::to_vec(&response)?)
}

pub fn decode_response<B: DeserializeOwned>(bytes: &[u8]) -> AgoraResult<Response<B>> {
    Ok(serde_json::from_slice(bytes)?)
}
