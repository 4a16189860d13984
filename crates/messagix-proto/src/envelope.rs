// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Platform response envelopes.
//!
//! Messenger:
//! `{"data":{"viewer":{"lightspeed_web_request":{"payload":"..","dependencies":[..]}}}}`
//!
//! Instagram Direct:
//! `{"data":{"lightspeed_web_request_for_igd":{"payload":"..","dependencies":[..]}}}`
//!
//! Both normalize to one [`LightSpeedParts`].

use serde::{Deserialize, Serialize};

use crate::wire::BoundedDump;

/// Which of the two envelope schemas to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeShape {
    /// `data.viewer.lightspeed_web_request`.
    Messenger,
    /// `data.lightspeed_web_request_for_igd`.
    Direct,
}

impl std::fmt::Display for EnvelopeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EnvelopeShape::Messenger => "messenger",
            EnvelopeShape::Direct => "direct",
        })
    }
}

/// The `(payload, dependencies)` pair every envelope carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSpeedParts {
    /// Payload document, still serialized.
    pub payload: String,
    /// Raw dependency list; `null` when the server omitted it.
    #[serde(default)]
    pub dependencies: serde_json::Value,
}

/// Messenger-shaped response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessengerEnvelope {
    /// `data` member.
    pub data: MessengerData,
}

/// `data` of a Messenger response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessengerData {
    /// `viewer` member.
    pub viewer: MessengerViewer,
}

/// `data.viewer` of a Messenger response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessengerViewer {
    /// Wrapped LightSpeed parts.
    pub lightspeed_web_request: LightSpeedParts,
}

/// Instagram-Direct-shaped response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectEnvelope {
    /// `data` member.
    pub data: DirectData,
}

/// `data` of an Instagram Direct response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectData {
    /// Wrapped LightSpeed parts.
    pub lightspeed_web_request_for_igd: LightSpeedParts,
}

/// A parsed response envelope of either shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// Messenger / Facebook.
    Messenger(MessengerEnvelope),
    /// Instagram Direct.
    Direct(DirectEnvelope),
}

/// Body did not match the expected envelope schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response does not match the {shape} envelope: {reason}")]
pub struct EnvelopeMismatch {
    /// Schema that was tried.
    pub shape: EnvelopeShape,
    /// Parser complaint.
    pub reason: String,
    /// Bounded dump of the offending body.
    pub dump: BoundedDump,
}

impl ResponseEnvelope {
    /// Parse `body` against `shape` only.
    ///
    /// On failure the error carries at most `dump_limit` bytes of the body.
    pub fn parse(
        shape: EnvelopeShape,
        body: &[u8],
        dump_limit: usize,
    ) -> Result<Self, EnvelopeMismatch> {
        let parsed = match shape {
            EnvelopeShape::Messenger => {
                serde_json::from_slice(body).map(ResponseEnvelope::Messenger)
            }
            EnvelopeShape::Direct => serde_json::from_slice(body).map(ResponseEnvelope::Direct),
        };
        parsed.map_err(|e| EnvelopeMismatch {
            shape,
            reason: e.to_string(),
            dump: BoundedDump::new(body, dump_limit),
        })
    }

    /// Schema of this envelope.
    pub fn shape(&self) -> EnvelopeShape {
        match self {
            ResponseEnvelope::Messenger(_) => EnvelopeShape::Messenger,
            ResponseEnvelope::Direct(_) => EnvelopeShape::Direct,
        }
    }

    /// Normalize to the shared pair.
    pub fn into_parts(self) -> LightSpeedParts {
        match self {
            ResponseEnvelope::Messenger(env) => env.data.viewer.lightspeed_web_request,
            ResponseEnvelope::Direct(env) => env.data.lightspeed_web_request_for_igd,
        }
    }
}
