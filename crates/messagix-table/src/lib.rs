// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client-side relational snapshot built from LightSpeed payloads.
//! Pure data (tables, rows, typed column values) with deterministic hashing/serialization.
//!
//! A [`TableStore`] maps table name → row key → column name → [`Value`]. Table
//! names and row keys are opaque strings defined by the wire format; nothing
//! here enumerates them.
//!
//! The store is exclusively owned by whoever holds it. Decode passes write into
//! a store they own and hand it to the caller only once fully applied; merging
//! into any longer-lived snapshot is the caller's job.

use std::collections::BTreeMap;

use ciborium::ser::into_writer;
use serde::{Deserialize, Serialize};

/// Blake3 state hash (32 bytes).
pub type Hash32 = [u8; 32];

/// One row: column name → value.
pub type Row = BTreeMap<String, Value>;

/// All rows of one table keyed by row key.
pub type Rows = BTreeMap<String, Row>;

/// Typed column value.
///
/// Serialized untagged so the JSON rendering matches the wire literal it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null (also produced by the wire's "undefined").
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Nested record.
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Render the value as a table name or row key.
    ///
    /// Only text and integers qualify; integers are rendered in decimal.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Table mutations produced by a decode pass.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOp {
    /// Merge `columns` into the row, creating the table/row if absent.
    UpsertRow {
        /// Table name.
        table: String,
        /// Row key.
        key: String,
        /// Columns to merge; columns not named here keep their prior values.
        columns: Row,
    },
    /// Remove a row. Removing an absent row is a no-op.
    DeleteRow {
        /// Table name.
        table: String,
        /// Row key.
        key: String,
    },
    /// Discard every existing row of the table and install `rows`.
    ReplaceTable {
        /// Table name.
        table: String,
        /// Full replacement row set (may be empty).
        rows: Rows,
    },
}

/// Errors raised while producing the canonical form of a store.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// CBOR encoding failed.
    #[error("canonical encoding failed: {0}")]
    Encode(String),
}

/// Typed in-memory snapshot of decoded LightSpeed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TableStore {
    tables: BTreeMap<String, Rows>,
}

impl TableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one mutation. Mutations never fail; every op is idempotent.
    pub fn apply_op(&mut self, op: TableOp) {
        match op {
            TableOp::UpsertRow {
                table,
                key,
                columns,
            } => {
                let row = self.tables.entry(table).or_default().entry(key).or_default();
                row.extend(columns);
            }
            TableOp::DeleteRow { table, key } => {
                if let Some(rows) = self.tables.get_mut(&table) {
                    rows.remove(&key);
                }
            }
            TableOp::ReplaceTable { table, rows } => {
                self.tables.insert(table, rows);
            }
        }
    }

    /// Rows of `table`, if the table has been seen.
    pub fn table(&self, table: &str) -> Option<&Rows> {
        self.tables.get(table)
    }

    /// A single row.
    pub fn row(&self, table: &str, key: &str) -> Option<&Row> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    /// A single cell.
    pub fn cell(&self, table: &str, key: &str, column: &str) -> Option<&Value> {
        self.row(table, key).and_then(|row| row.get(column))
    }

    /// Iterate tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Rows)> {
        self.tables.iter().map(|(name, rows)| (name.as_str(), rows))
    }

    /// Number of tables (including tables emptied by deletes or replaced with nothing).
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` when no table has been touched.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Canonical CBOR serialization for hashing/comparison.
    ///
    /// All maps are ordered, so equal stores always produce equal bytes.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut bytes = Vec::new();
        into_writer(&self.tables, &mut bytes).map_err(|e| TableError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Compute blake3 hash of the canonical form.
    pub fn compute_hash(&self) -> Result<Hash32, TableError> {
        let bytes = self.to_canonical_bytes()?;
        Ok(blake3::hash(&bytes).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn upsert(table: &str, key: &str, columns: Row) -> TableOp {
        TableOp::UpsertRow {
            table: table.into(),
            key: key.into(),
            columns,
        }
    }

    #[test]
    fn upsert_creates_table_and_row() {
        let mut store = TableStore::new();
        store.apply_op(upsert("threads", "t1", row(&[("name", "general".into())])));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.cell("threads", "t1", "name"),
            Some(&Value::Text("general".into()))
        );
    }

    #[test]
    fn upsert_merges_at_column_granularity() {
        let mut store = TableStore::new();
        store.apply_op(upsert(
            "messages",
            "m1",
            row(&[("text", "hi".into()), ("sender", Value::Int(7))]),
        ));
        store.apply_op(upsert("messages", "m1", row(&[("text", "edited".into())])));

        let r = store.row("messages", "m1").unwrap();
        assert_eq!(r.get("text"), Some(&Value::Text("edited".into())));
        assert_eq!(r.get("sender"), Some(&Value::Int(7)));
    }

    #[test]
    fn delete_missing_row_is_noop() {
        let mut store = TableStore::new();
        store.apply_op(TableOp::DeleteRow {
            table: "threads".into(),
            key: "nope".into(),
        });
        assert!(store.is_empty());

        store.apply_op(upsert("threads", "t1", Row::new()));
        store.apply_op(TableOp::DeleteRow {
            table: "threads".into(),
            key: "t1".into(),
        });
        assert!(store.row("threads", "t1").is_none());
        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn replace_table_is_full_swap() {
        let mut store = TableStore::new();
        store.apply_op(upsert("contacts", "a", row(&[("n", Value::Int(1))])));
        store.apply_op(upsert("contacts", "b", row(&[("n", Value::Int(2))])));

        let mut rows = Rows::new();
        rows.insert("c".into(), row(&[("n", Value::Int(3))]));
        store.apply_op(TableOp::ReplaceTable {
            table: "contacts".into(),
            rows: rows.clone(),
        });

        assert_eq!(store.table("contacts"), Some(&rows));
    }

    #[test]
    fn hash_is_order_independent_for_equal_stores() {
        let mut a = TableStore::new();
        a.apply_op(upsert("x", "1", row(&[("v", Value::Bool(true))])));
        a.apply_op(upsert("y", "2", row(&[("v", Value::Null)])));

        let mut b = TableStore::new();
        b.apply_op(upsert("y", "2", row(&[("v", Value::Null)])));
        b.apply_op(upsert("x", "1", row(&[("v", Value::Bool(true))])));

        assert_eq!(a, b);
        assert_eq!(a.compute_hash().unwrap(), b.compute_hash().unwrap());

        b.apply_op(upsert("x", "1", row(&[("v", Value::Bool(false))])));
        assert_ne!(a.compute_hash().unwrap(), b.compute_hash().unwrap());
    }

    #[test]
    fn json_rendering_is_untagged() {
        let mut store = TableStore::new();
        store.apply_op(upsert(
            "threads",
            "1",
            row(&[("id", Value::Int(1)), ("muted", Value::Bool(false))]),
        ));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"threads": {"1": {"id": 1, "muted": false}}})
        );
    }

    #[test]
    fn key_rendering() {
        assert_eq!(Value::Int(42).as_key().as_deref(), Some("42"));
        assert_eq!(Value::from("k").as_key().as_deref(), Some("k"));
        assert_eq!(Value::Bool(true).as_key(), None);
        assert_eq!(Value::Null.kind(), "null");
    }
}
