// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Decode errors.

/// Errors produced while resolving dependencies or applying steps.
///
/// Every variant is fatal to the decode pass that raised it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LsError {
    /// The dependency list contained an entry that is neither a literal nor a
    /// well-formed reference.
    #[error("malformed dependencies: {0}")]
    MalformedDependencies(String),
    /// A step referenced a dependency key that is not in the map.
    #[error("unresolved dependency {key:?} at step {step}")]
    UnresolvedDependency {
        /// Missing key.
        key: String,
        /// Index of the step that referenced it (depth-first order).
        step: usize,
    },
    /// The payload document could not be read as step data.
    #[error("malformed lightspeed payload: {0}")]
    PayloadMalformed(String),
    /// A known opcode had the wrong argument count or argument types.
    #[error("decode failed at step {step}: {reason}")]
    DecodeFailed {
        /// Index of the failing step (depth-first order).
        step: usize,
        /// What was wrong.
        reason: String,
    },
}
