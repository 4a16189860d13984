// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Step interpreter.
//!
//! Instructions run depth-first in wire order; each one is fully resolved
//! before it touches the store, and the first failure ends the pass. Step
//! indices in errors count visited instructions in that same depth-first
//! order. A skipped opcode is one step; its operands are never visited.

use std::collections::BTreeMap;

use messagix_table::{Row, Rows, TableOp, TableStore, Value};
use tracing::{trace, warn};

use crate::step::{Arg, Opcode, Step};
use crate::{DependencyMap, LsError};

/// Applies instructions to a [`TableStore`], resolving references through a
/// [`DependencyMap`].
#[derive(Debug, Clone, Copy)]
pub struct StepDecoder<'d> {
    deps: &'d DependencyMap,
}

impl<'d> StepDecoder<'d> {
    /// Create a decoder over a resolved dependency map.
    pub fn new(deps: &'d DependencyMap) -> Self {
        Self { deps }
    }

    /// Decode `root` into a fresh store.
    ///
    /// On error nothing is returned; the partially-built store is dropped.
    pub fn decode(&self, root: &Step) -> Result<TableStore, LsError> {
        let mut store = TableStore::new();
        self.run(root, &mut store, &mut 0)?;
        Ok(store)
    }

    /// Apply `root` on top of an existing store.
    ///
    /// Work happens on a staged copy that replaces `store` only once every
    /// instruction has applied; on error `store` is left untouched.
    pub fn apply(&self, root: &Step, store: &mut TableStore) -> Result<(), LsError> {
        let mut staged = store.clone();
        self.run(root, &mut staged, &mut 0)?;
        *store = staged;
        Ok(())
    }

    fn run(&self, step: &Step, store: &mut TableStore, cursor: &mut usize) -> Result<(), LsError> {
        let index = *cursor;
        *cursor += 1;

        match step.opcode {
            Opcode::Block => {
                for (pos, member) in step.args.iter().enumerate() {
                    let Arg::Step(child) = member else {
                        return Err(failed(
                            index,
                            format!("block member {pos} is a {}, not an instruction", member.kind()),
                        ));
                    };
                    self.run(child, store, cursor)?;
                }
            }
            Opcode::UpsertRow => {
                let [table, key, columns] = operands::<3>(step, index)?;
                let op = TableOp::UpsertRow {
                    table: self.resolve_key(table, index, "table name")?,
                    key: self.resolve_key(key, index, "row key")?,
                    columns: self.resolve_record(columns, index, "columns")?,
                };
                store.apply_op(op);
            }
            Opcode::DeleteRow => {
                let [table, key] = operands::<2>(step, index)?;
                let op = TableOp::DeleteRow {
                    table: self.resolve_key(table, index, "table name")?,
                    key: self.resolve_key(key, index, "row key")?,
                };
                store.apply_op(op);
            }
            Opcode::ReplaceTable => {
                let [table, rows] = operands::<2>(step, index)?;
                let table = self.resolve_key(table, index, "table name")?;
                let mut replacement = Rows::new();
                for (key, row) in self.resolve_record(rows, index, "rows")? {
                    let Value::Record(columns) = row else {
                        return Err(failed(
                            index,
                            format!("row {key:?} must be a record, got {}", row.kind()),
                        ));
                    };
                    replacement.insert(key, columns);
                }
                store.apply_op(TableOp::ReplaceTable {
                    table,
                    rows: replacement,
                });
            }
            Opcode::Ignored(code) => {
                trace!(opcode = code, step = index, "skipping no-op lightspeed instruction");
            }
            Opcode::Unrecognized(code) => {
                warn!(opcode = code, step = index, "skipping unrecognized lightspeed opcode");
            }
        }
        Ok(())
    }

    fn resolve(&self, arg: &Arg, index: usize) -> Result<Value, LsError> {
        match arg {
            Arg::Scalar(value) => Ok(value.clone()),
            Arg::Dependency(key) => {
                self.deps
                    .get(key)
                    .cloned()
                    .ok_or_else(|| LsError::UnresolvedDependency {
                        key: key.clone(),
                        step: index,
                    })
            }
            Arg::List(items) => items
                .iter()
                .map(|item| self.resolve(item, index))
                .collect::<Result<Vec<_>, LsError>>()
                .map(Value::List),
            Arg::Structured(members) => members
                .iter()
                .map(|(name, member)| Ok((name.clone(), self.resolve(member, index)?)))
                .collect::<Result<BTreeMap<_, _>, LsError>>()
                .map(Value::Record),
            Arg::Step(_) | Arg::Opaque(_) => {
                Err(failed(index, format!("{} used as a value", arg.kind())))
            }
        }
    }

    fn resolve_key(&self, arg: &Arg, index: usize, what: &str) -> Result<String, LsError> {
        let value = self.resolve(arg, index)?;
        value
            .as_key()
            .ok_or_else(|| failed(index, format!("{what} must be text or integer, got {}", value.kind())))
    }

    fn resolve_record(&self, arg: &Arg, index: usize, what: &str) -> Result<Row, LsError> {
        match self.resolve(arg, index)? {
            Value::Record(record) => Ok(record),
            other => Err(failed(index, format!("{what} must be a record, got {}", other.kind()))),
        }
    }
}

fn operands<const N: usize>(step: &Step, index: usize) -> Result<&[Arg; N], LsError> {
    <&[Arg; N]>::try_from(step.args.as_slice()).map_err(|_| {
        failed(
            index,
            format!(
                "opcode {} takes {} operands, got {}",
                step.opcode.code(),
                N,
                step.args.len()
            ),
        )
    })
}

fn failed(step: usize, reason: String) -> LsError {
    LsError::DecodeFailed { step, reason }
}
