// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire schema for the messagix client.
//!
//! Everything here is plain data plus pure framing helpers; no I/O. The
//! request orchestrator (`messagix-client`) and the push-socket collaborator
//! both build on these types so there is exactly one definition of each wire
//! shape.

pub mod envelope;
mod error;
pub mod graphql;
mod platform;
pub mod task;
pub mod wire;

pub use envelope::{EnvelopeMismatch, EnvelopeShape, LightSpeedParts, ResponseEnvelope};
pub use error::ProtocolError;
pub use graphql::{
    GraphQLOperation, LsRequestType, LsRequestVariables, LsSyncVariables, OperationRegistry,
    OperationTable, RequestEnvelope,
};
pub use platform::{Endpoints, Platform};
pub use task::{QueueName, Task, TaskBatch, TaskEncoder, TaskError, TaskIdCounter, TaskRecord};
pub use wire::BoundedDump;
