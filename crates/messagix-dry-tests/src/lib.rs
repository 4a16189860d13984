// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for messagix crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`payload`] - LightSpeed payload and dependency list builders
//! - [`registry`] - Operation registry fixture
//! - [`response`] - Response body builders for both envelope shapes
//! - [`transport`] - Scripted transport that records requests

pub mod config;
pub mod payload;
pub mod registry;
pub mod response;
pub mod transport;

pub use config::InMemoryConfigStore;
pub use payload::{dep, DependenciesBuilder, PayloadBuilder};
pub use registry::{fixture_registry, FIXTURE_DOC_ID, FIXTURE_IG_DOC_ID, FIXTURE_SEARCH_OP};
pub use response::ResponseBuilder;
pub use transport::{decode_form, MockTransport};
