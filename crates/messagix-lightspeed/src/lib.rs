// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! LightSpeed decoding: dependency resolution plus the step interpreter that
//! turns a payload into a [`TableStore`].
//!
//! Raw JSON is converted into closed, typed variants at the boundary
//! ([`DependencyEntry`], [`Arg`], [`Opcode`]); the interpreter never looks at
//! open-ended JSON. Unknown opcodes decode to [`Opcode::Unrecognized`] and are
//! skipped, so server-side additions do not break older clients.
//!
//! Decoding is pure computation: it never blocks and is not resumable. The
//! same payload may be decoded any number of times (e.g. replay after a
//! reconnect) and always yields the same store.

mod decoder;
mod deps;
mod error;
pub mod step;

pub use decoder::StepDecoder;
pub use deps::{DependencyEntry, DependencyMap};
pub use error::LsError;
pub use messagix_table::{TableStore, Value};
pub use step::{Arg, LightSpeedPayload, Opcode, Step};

/// Decode one LightSpeed payload and its dependency list into a fresh store.
///
/// This is the single entry point for both request/response traffic and
/// push-socket deliveries.
pub fn decode_lightspeed(
    payload: &str,
    dependencies: &serde_json::Value,
) -> Result<TableStore, LsError> {
    let payload = LightSpeedPayload::parse(payload)?;
    let deps = DependencyMap::from_json(dependencies)?;
    StepDecoder::new(&deps).decode(&payload.root)
}

/// Convert a JSON literal into a typed column value.
///
/// Integers that fit `i64` stay integers; every other number becomes a float.
pub fn literal(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(literal).collect()),
        serde_json::Value::Object(members) => Value::Record(
            members
                .iter()
                .map(|(k, v)| (k.clone(), literal(v)))
                .collect(),
        ),
    }
}
