// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dependency list resolution.
//!
//! Entry shapes:
//!
//! * bare JSON value (anything but an object) – positional literal, keyed by its
//!   decimal index;
//! * `{"id": "<key>", "value": <json>}` – declared literal;
//! * `{"id": "<key>", "ref": "<earlier key>"}` – reference to an entry declared
//!   earlier in the list.
//!
//! References are collapsed while resolving, so the finished map holds literals
//! only. There are no forward references: a `ref` naming a key that has not been
//! declared yet is malformed.

use std::collections::BTreeMap;

use messagix_table::Value;

use crate::{literal, LsError};

/// One decoded element of the dependency list.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyEntry {
    /// Literal stored under `key`.
    Literal {
        /// Resolver key (declared id or positional index).
        key: String,
        /// Literal value.
        value: Value,
    },
    /// Alias of an earlier entry.
    Reference {
        /// Resolver key of this entry.
        key: String,
        /// Key of the referenced entry.
        target: String,
    },
}

impl DependencyEntry {
    /// Decode the entry at `index` of a raw dependency list.
    pub fn from_json(index: usize, json: &serde_json::Value) -> Result<Self, LsError> {
        let serde_json::Value::Object(map) = json else {
            return Ok(DependencyEntry::Literal {
                key: index.to_string(),
                value: literal(json),
            });
        };

        let malformed = |reason: &str| LsError::MalformedDependencies(format!("entry {index}: {reason}"));

        if let Some(extra) = map
            .keys()
            .find(|k| !matches!(k.as_str(), "id" | "value" | "ref"))
        {
            return Err(malformed(&format!("unexpected field {extra:?}")));
        }
        let key = match map.get("id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(_) => return Err(malformed("id must be a string")),
            None => return Err(malformed("missing id")),
        };
        match (map.get("value"), map.get("ref")) {
            (Some(value), None) => Ok(DependencyEntry::Literal {
                key,
                value: literal(value),
            }),
            (None, Some(serde_json::Value::String(target))) => Ok(DependencyEntry::Reference {
                key,
                target: target.clone(),
            }),
            (None, Some(_)) => Err(malformed("ref must be a string key")),
            (Some(_), Some(_)) => Err(malformed("declares both value and ref")),
            (None, None) => Err(malformed("declares neither value nor ref")),
        }
    }

    /// Resolver key of this entry.
    pub fn key(&self) -> &str {
        match self {
            DependencyEntry::Literal { key, .. } | DependencyEntry::Reference { key, .. } => key,
        }
    }
}

/// Resolved dependency map handed to the step decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyMap {
    values: BTreeMap<String, Value>,
}

impl DependencyMap {
    /// Empty map (valid; common for bulk/full-table payloads).
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the raw dependency field of a response.
    ///
    /// `null` is treated as the empty list.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, LsError> {
        match raw {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Array(entries) => Self::resolve(entries),
            other => Err(LsError::MalformedDependencies(format!(
                "expected a list, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Resolve a list of raw entries in order.
    pub fn resolve(entries: &[serde_json::Value]) -> Result<Self, LsError> {
        let mut map = Self::new();
        for (index, raw) in entries.iter().enumerate() {
            let entry = DependencyEntry::from_json(index, raw)?;
            map.insert(index, entry)?;
        }
        Ok(map)
    }

    fn insert(&mut self, index: usize, entry: DependencyEntry) -> Result<(), LsError> {
        if self.values.contains_key(entry.key()) {
            return Err(LsError::MalformedDependencies(format!(
                "entry {index}: duplicate key {:?}",
                entry.key()
            )));
        }
        let (key, value) = match entry {
            DependencyEntry::Literal { key, value } => (key, value),
            DependencyEntry::Reference { key, target } => {
                let Some(value) = self.values.get(&target) else {
                    return Err(LsError::MalformedDependencies(format!(
                        "entry {index}: reference to {target:?} which is not declared before it"
                    )));
                };
                (key, value.clone())
            }
        };
        self.values.insert(key, value);
        Ok(())
    }

    /// Look up a resolved value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_null_lists_are_valid() {
        assert!(DependencyMap::from_json(&json!([])).unwrap().is_empty());
        assert!(DependencyMap::from_json(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn positional_and_declared_literals() {
        let map = DependencyMap::from_json(&json!([
            "alpha",
            42,
            {"id": "thread", "value": {"name": "general"}},
        ]))
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("0"), Some(&Value::Text("alpha".into())));
        assert_eq!(map.get("1"), Some(&Value::Int(42)));
        let Some(Value::Record(thread)) = map.get("thread") else {
            panic!("expected record");
        };
        assert_eq!(thread.get("name"), Some(&Value::Text("general".into())));
    }

    #[test]
    fn references_collapse_to_earlier_literal() {
        let map = DependencyMap::from_json(&json!([
            {"id": "a", "value": 7},
            {"id": "b", "ref": "a"},
            {"id": "c", "ref": "b"},
        ]))
        .unwrap();
        assert_eq!(map.get("c"), Some(&Value::Int(7)));
    }

    #[test]
    fn forward_reference_is_malformed() {
        let err = DependencyMap::from_json(&json!([
            {"id": "b", "ref": "a"},
            {"id": "a", "value": 1},
        ]))
        .unwrap_err();
        assert!(matches!(err, LsError::MalformedDependencies(_)));
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        for bad in [
            json!([{"value": 1}]),
            json!([{"id": 3, "value": 1}]),
            json!([{"id": "x"}]),
            json!([{"id": "x", "value": 1, "ref": "y"}]),
            json!([{"id": "x", "ref": 5}]),
            json!([{"id": "x", "value": 1, "extra": true}]),
            json!([{"id": "x", "value": 1}, {"id": "x", "value": 2}]),
            json!({"not": "a list"}),
        ] {
            let err = DependencyMap::from_json(&bad).unwrap_err();
            assert!(
                matches!(err, LsError::MalformedDependencies(_)),
                "{bad} -> {err:?}"
            );
        }
    }
}
