// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Response body to [`TableStore`].
//!
//! Pure and synchronous; shared by the request path, the push-socket
//! collaborator, and offline tooling.

use messagix_lightspeed::{decode_lightspeed, TableStore};
use messagix_proto::wire::strip_anti_js_prefix;
use messagix_proto::{EnvelopeShape, LightSpeedParts, ProtocolError, ResponseEnvelope};
use tracing::debug;

use crate::ClientError;

/// Decode a raw GraphQL response body.
///
/// Strips the anti-parsing prefix, surfaces a server error object, parses the
/// `shape` envelope, then decodes the embedded payload.
pub fn decode_response(
    shape: EnvelopeShape,
    body: &[u8],
    dump_limit: usize,
) -> Result<TableStore, ClientError> {
    let body = strip_anti_js_prefix(body);
    if let Some(err) = ProtocolError::detect(body) {
        return Err(err.into());
    }
    let envelope = ResponseEnvelope::parse(shape, body, dump_limit).map_err(|err| {
        debug!(
            %shape,
            total_len = err.dump.total_len,
            truncated = err.dump.truncated,
            dump = %err.dump,
            "response did not match envelope"
        );
        err
    })?;
    decode_parts(&envelope.into_parts())
}

/// Decode an already-unwrapped `(payload, dependencies)` pair.
pub fn decode_parts(parts: &LightSpeedParts) -> Result<TableStore, ClientError> {
    Ok(decode_lightspeed(&parts.payload, &parts.dependencies)?)
}
