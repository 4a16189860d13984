// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed step model decoded from the raw payload document.
//!
//! Instruction layout: `[opcode, arg...]`.
//!
//! | code | meaning | shape |
//! |------|---------|-------|
//! | 1  | block | `[1, instr...]` |
//! | 2  | dependency reference (argument only) | `[2, key]` |
//! | 3  | upsert-row | `[3, table, row_key, {column: arg}]` |
//! | 4  | delete-row | `[4, table, row_key]` |
//! | 5  | replace-table | `[5, table, {row_key: {column: arg}}]` |
//! | 6  | log (no-op) | any |
//! | 7  | checkpoint (no-op) | any |
//! | 9  | undefined (argument only) | `[9]` |
//! | 19 | i64 from string (argument only) | `[19, "123"]` |
//!
//! Anything else decodes to [`Opcode::Unrecognized`] and is skipped by the
//! decoder. Operands of skipped opcodes are never interpreted.
//!
//! In value position an array headed by 2, 9 or 19 is an expression; any
//! other array is a list literal.

use std::collections::BTreeMap;

use messagix_table::Value;
use serde::Deserialize;

use crate::deps::json_kind;
use crate::{literal, LsError};

/// Numeric opcodes.
pub mod opcode {
    /// Ordered group of instructions.
    pub const BLOCK: i64 = 1;
    /// Dependency reference expression.
    pub const DEPENDENCY: i64 = 2;
    /// Merge columns into a row.
    pub const UPSERT_ROW: i64 = 3;
    /// Remove a row.
    pub const DELETE_ROW: i64 = 4;
    /// Swap the full contents of a table.
    pub const REPLACE_TABLE: i64 = 5;
    /// Server-side log line; no client effect.
    pub const LOG: i64 = 6;
    /// Sync cursor hint; owned by the sync collaborator, no table effect.
    pub const CHECKPOINT: i64 = 7;
    /// The undefined constant.
    pub const UNDEFINED: i64 = 9;
    /// 64-bit integer carried as a decimal string.
    pub const I64_FROM_STRING: i64 = 19;
}

/// Closed set of instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// [`opcode::BLOCK`].
    Block,
    /// [`opcode::UPSERT_ROW`].
    UpsertRow,
    /// [`opcode::DELETE_ROW`].
    DeleteRow,
    /// [`opcode::REPLACE_TABLE`].
    ReplaceTable,
    /// Documented opcode with no table effect.
    Ignored(i64),
    /// Opcode this client does not know.
    Unrecognized(i64),
}

impl Opcode {
    /// Map a numeric code to its opcode.
    pub fn from_code(code: i64) -> Self {
        match code {
            opcode::BLOCK => Opcode::Block,
            opcode::UPSERT_ROW => Opcode::UpsertRow,
            opcode::DELETE_ROW => Opcode::DeleteRow,
            opcode::REPLACE_TABLE => Opcode::ReplaceTable,
            opcode::LOG | opcode::CHECKPOINT => Opcode::Ignored(code),
            other => Opcode::Unrecognized(other),
        }
    }

    /// Numeric code.
    pub fn code(self) -> i64 {
        match self {
            Opcode::Block => opcode::BLOCK,
            Opcode::UpsertRow => opcode::UPSERT_ROW,
            Opcode::DeleteRow => opcode::DELETE_ROW,
            Opcode::ReplaceTable => opcode::REPLACE_TABLE,
            Opcode::Ignored(code) | Opcode::Unrecognized(code) => code,
        }
    }
}

fn is_expression(code: i64) -> bool {
    matches!(
        code,
        opcode::DEPENDENCY | opcode::UNDEFINED | opcode::I64_FROM_STRING
    )
}

/// Instruction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Scalar literal (null, bool, number, text).
    Scalar(Value),
    /// List literal whose elements are themselves arguments.
    List(Vec<Arg>),
    /// Structured literal whose members are themselves arguments.
    Structured(BTreeMap<String, Arg>),
    /// Reference into the dependency map.
    Dependency(String),
    /// Nested instruction; only produced for block members.
    Step(Step),
    /// Operand of a skipped opcode, kept as raw JSON and never interpreted.
    Opaque(serde_json::Value),
}

impl Arg {
    /// Decode one raw argument in value position.
    ///
    /// Arrays headed by an expression opcode (2, 9, 19) are expressions; every
    /// other array is a list literal.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, LsError> {
        match json {
            serde_json::Value::Array(items) => {
                let expression = items.split_first().and_then(|(head, rest)| {
                    head.as_i64()
                        .filter(|code| is_expression(*code))
                        .map(|code| (code, rest))
                });
                match expression {
                    Some((code, rest)) => Self::expression(code, rest),
                    None => items
                        .iter()
                        .map(Arg::from_json)
                        .collect::<Result<_, _>>()
                        .map(Arg::List),
                }
            }
            serde_json::Value::Object(members) => members
                .iter()
                .map(|(name, raw)| Ok((name.clone(), Arg::from_json(raw)?)))
                .collect::<Result<BTreeMap<_, _>, LsError>>()
                .map(Arg::Structured),
            scalar => Ok(Arg::Scalar(literal(scalar))),
        }
    }

    /// Decode one block member: arrays are instructions, anything else is
    /// left for the decoder to reject.
    fn member(json: &serde_json::Value) -> Result<Self, LsError> {
        if json.is_array() {
            Step::from_json(json).map(Arg::Step)
        } else {
            Arg::from_json(json)
        }
    }

    fn expression(code: i64, rest: &[serde_json::Value]) -> Result<Self, LsError> {
        match code {
            opcode::DEPENDENCY => match rest {
                [serde_json::Value::String(key)] => Ok(Arg::Dependency(key.clone())),
                [serde_json::Value::Number(n)] if n.is_u64() => Ok(Arg::Dependency(n.to_string())),
                _ => Err(LsError::PayloadMalformed(
                    "dependency reference must be [2, key]".into(),
                )),
            },
            opcode::UNDEFINED if rest.is_empty() => Ok(Arg::Scalar(Value::Null)),
            opcode::UNDEFINED => Err(LsError::PayloadMalformed(
                "undefined takes no operands".into(),
            )),
            _ => match rest {
                [serde_json::Value::String(digits)] => digits
                    .parse::<i64>()
                    .map(|i| Arg::Scalar(Value::Int(i)))
                    .map_err(|e| LsError::PayloadMalformed(format!("i64 operand {digits:?}: {e}"))),
                _ => Err(LsError::PayloadMalformed(
                    "i64-from-string must be [19, \"digits\"]".into(),
                )),
            },
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Scalar(_) => "scalar",
            Arg::List(_) => "list literal",
            Arg::Structured(_) => "structured literal",
            Arg::Dependency(_) => "dependency reference",
            Arg::Step(_) => "instruction",
            Arg::Opaque(_) => "opaque operand",
        }
    }
}

/// One decode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Opcode.
    pub opcode: Opcode,
    /// Arguments in wire order.
    pub args: Vec<Arg>,
}

impl Step {
    /// Decode one raw instruction.
    ///
    /// The opcode is classified before any operand is read: block members
    /// and the operands of table opcodes decode strictly, while operands of
    /// no-op and unrecognized opcodes stay [`Arg::Opaque`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self, LsError> {
        let serde_json::Value::Array(items) = json else {
            return Err(LsError::PayloadMalformed(format!(
                "instruction must be an array, got {}",
                json_kind(json)
            )));
        };
        let (code, rest) = split_head(items)?;
        if is_expression(code) {
            return Err(LsError::PayloadMalformed(format!(
                "opcode {code} is an argument expression, not an instruction"
            )));
        }
        let opcode = Opcode::from_code(code);
        let args: Vec<Arg> = match opcode {
            Opcode::Block => rest.iter().map(Arg::member).collect::<Result<_, _>>()?,
            Opcode::UpsertRow | Opcode::DeleteRow | Opcode::ReplaceTable => {
                rest.iter().map(Arg::from_json).collect::<Result<_, _>>()?
            }
            Opcode::Ignored(_) | Opcode::Unrecognized(_) => {
                rest.iter().cloned().map(Arg::Opaque).collect()
            }
        };
        Ok(Step { opcode, args })
    }
}

fn split_head(items: &[serde_json::Value]) -> Result<(i64, &[serde_json::Value]), LsError> {
    let Some((head, rest)) = items.split_first() else {
        return Err(LsError::PayloadMalformed("empty instruction".into()));
    };
    let code = head.as_i64().ok_or_else(|| {
        LsError::PayloadMalformed(format!("opcode must be an integer, got {head}"))
    })?;
    Ok((code, rest))
}

/// Parsed LightSpeed payload document: `{"name": .., "step": [..]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSpeedPayload {
    /// Optional payload name (informational).
    pub name: Option<String>,
    /// Root instruction, usually a block.
    pub root: Step,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    name: Option<String>,
    step: serde_json::Value,
}

impl LightSpeedPayload {
    /// Parse the payload text carried inside a response envelope.
    pub fn parse(text: &str) -> Result<Self, LsError> {
        let raw: RawPayload =
            serde_json::from_str(text).map_err(|e| LsError::PayloadMalformed(e.to_string()))?;
        Ok(Self {
            name: raw.name,
            root: Step::from_json(&raw.step)?,
        })
    }
}
