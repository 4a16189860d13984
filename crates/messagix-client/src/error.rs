// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Call failure taxonomy.

use messagix_lightspeed::LsError;
use messagix_proto::{EnvelopeMismatch, ProtocolError, TaskError};
use thiserror::Error;

use crate::transport::TransportError;

/// Per-call request states.
///
/// `Built -> Sent -> (TransportError | Received)`,
/// `Received -> (ProtocolErrorDetected | EnvelopeMismatch | EnvelopeParsed)`,
/// `EnvelopeParsed -> (PayloadMalformed | DecodeFailed | Decoded)`.
/// `Rejected` covers calls refused before a request existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Refused before any request was built.
    Rejected,
    /// Request framed.
    Built,
    /// Handed to the transport.
    Sent,
    /// Transport failed.
    TransportError,
    /// Body received.
    Received,
    /// Body was a server error object.
    ProtocolErrorDetected,
    /// Body matched no known envelope.
    EnvelopeMismatch,
    /// Envelope parsed.
    EnvelopeParsed,
    /// Payload or dependency list did not parse.
    PayloadMalformed,
    /// Step application failed.
    DecodeFailed,
    /// Store produced.
    Decoded,
}

impl CallState {
    /// Whether no further transition follows.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            CallState::Built | CallState::Sent | CallState::Received | CallState::EnvelopeParsed
        )
    }
}

/// Coarse failure class, for retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Programmer error, caught before I/O.
    Caller,
    /// Network/HTTP fault; retryable.
    Transport,
    /// Server-classified error; inspect the code.
    Protocol,
    /// Response schema drift.
    EnvelopeMismatch,
    /// Corrupt payload or dependency list.
    Payload,
}

/// Failure of one orchestrated call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation name is not registered.
    #[error("unknown graphql operation: {0}")]
    UnknownOperation(String),
    /// Task label has no opcode.
    #[error("unknown task label: {0}")]
    UnknownTaskLabel(String),
    /// The task id counter is exhausted.
    #[error("task id space exhausted")]
    TaskIdsExhausted,
    /// Variables or task payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Server error object.
    #[error("protocol error {0}")]
    Protocol(#[from] ProtocolError),
    /// Body matched no known envelope.
    #[error(transparent)]
    EnvelopeMismatch(#[from] EnvelopeMismatch),
    /// Payload-level failure; no partial store escapes.
    #[error(transparent)]
    Payload(#[from] LsError),
}

impl From<TaskError> for ClientError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::UnknownTaskLabel(label) => ClientError::UnknownTaskLabel(label),
            TaskError::Encode(reason) => ClientError::Encode(reason),
            TaskError::IdsExhausted => ClientError::TaskIdsExhausted,
        }
    }
}

impl ClientError {
    /// Failure class.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::UnknownOperation(_)
            | ClientError::UnknownTaskLabel(_)
            | ClientError::TaskIdsExhausted
            | ClientError::Encode(_) => ErrorClass::Caller,
            ClientError::Transport(_) => ErrorClass::Transport,
            ClientError::Protocol(_) => ErrorClass::Protocol,
            ClientError::EnvelopeMismatch(_) => ErrorClass::EnvelopeMismatch,
            ClientError::Payload(_) => ErrorClass::Payload,
        }
    }

    /// State the call ended in.
    pub fn terminal_state(&self) -> CallState {
        match self {
            ClientError::UnknownOperation(_)
            | ClientError::UnknownTaskLabel(_)
            | ClientError::TaskIdsExhausted
            | ClientError::Encode(_) => CallState::Rejected,
            ClientError::Transport(_) => CallState::TransportError,
            ClientError::Protocol(_) => CallState::ProtocolErrorDetected,
            ClientError::EnvelopeMismatch(_) => CallState::EnvelopeMismatch,
            ClientError::Payload(LsError::MalformedDependencies(_) | LsError::PayloadMalformed(_)) => {
                CallState::PayloadMalformed
            }
            ClientError::Payload(
                LsError::UnresolvedDependency { .. } | LsError::DecodeFailed { .. },
            ) => CallState::DecodeFailed,
        }
    }

    /// Only transport faults are worth retrying blindly.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transport
    }

    /// Server error object, if that is what ended the call.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            ClientError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}
