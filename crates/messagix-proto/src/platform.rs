// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Platform flag and per-platform endpoints.

use serde::{Deserialize, Serialize};

use crate::envelope::EnvelopeShape;

/// Surface the client talks to. Decided once per client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// facebook.com messages.
    #[default]
    Facebook,
    /// messenger.com.
    Messenger,
    /// Instagram Direct.
    Instagram,
}

impl Platform {
    /// Facebook and Messenger share the Messenger API surface.
    pub fn is_messenger(self) -> bool {
        matches!(self, Platform::Facebook | Platform::Messenger)
    }

    /// Response envelope schema this platform answers with.
    pub fn envelope_shape(self) -> EnvelopeShape {
        if self.is_messenger() {
            EnvelopeShape::Messenger
        } else {
            EnvelopeShape::Direct
        }
    }

    /// Default endpoints for this platform.
    pub fn endpoints(self) -> Endpoints {
        let (base, messages) = match self {
            Platform::Facebook => ("https://www.facebook.com", "/messages"),
            Platform::Messenger => ("https://www.messenger.com", "/t"),
            Platform::Instagram => ("https://www.instagram.com", "/direct/inbox"),
        };
        Endpoints {
            base_url: base.to_owned(),
            messages: format!("{base}{messages}"),
            graphql: format!("{base}/api/graphql/"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Platform::Facebook => "facebook",
            Platform::Messenger => "messenger",
            Platform::Instagram => "instagram",
        })
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "facebook" | "fb" => Ok(Platform::Facebook),
            "messenger" => Ok(Platform::Messenger),
            "instagram" | "ig" => Ok(Platform::Instagram),
            other => Err(format!("unknown platform {other:?}")),
        }
    }
}

/// URLs used to frame GraphQL requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Origin, e.g. `https://www.messenger.com`.
    pub base_url: String,
    /// Messages page; used (with a trailing slash) as referer.
    pub messages: String,
    /// GraphQL POST target.
    pub graphql: String,
}
