// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Request orchestration for the messagix client.
//!
//! A call walks `Built -> Sent -> Received -> EnvelopeParsed -> Decoded`
//! (see [`CallState`]); every failure is returned with enough structure to
//! tell transport faults, server-classified errors, schema drift, and payload
//! corruption apart ([`ClientError::class`]). No retry happens here.

mod client;
pub mod config;
mod decode;
mod error;
mod session;
mod transport;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, ConfigService, ConfigStore};
pub use decode::{decode_parts, decode_response};
pub use error::{CallState, ClientError, ErrorClass};
pub use messagix_lightspeed::{TableStore, Value};
pub use messagix_proto as proto;
pub use session::{Session, StaticSession};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};
