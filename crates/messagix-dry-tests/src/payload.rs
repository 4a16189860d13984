// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! LightSpeed payload and dependency list builders.

use serde_json::{json, Value};

/// Builds a payload document: one root block of instructions.
///
/// # Example
///
/// ```
/// use messagix_dry_tests::PayloadBuilder;
///
/// let payload = PayloadBuilder::new()
///     .upsert("threads", "t1", serde_json::json!({"name": "general"}))
///     .delete("threads", "t0")
///     .build();
/// assert!(payload.contains("\"step\""));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    name: Option<String>,
    steps: Vec<Value>,
}

impl PayloadBuilder {
    /// Empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append `[3, table, key, columns]`.
    pub fn upsert(self, table: &str, key: &str, columns: Value) -> Self {
        self.raw(json!([3, table, key, columns]))
    }

    /// Append `[4, table, key]`.
    pub fn delete(self, table: &str, key: &str) -> Self {
        self.raw(json!([4, table, key]))
    }

    /// Append `[5, table, rows]`.
    pub fn replace(self, table: &str, rows: Value) -> Self {
        self.raw(json!([5, table, rows]))
    }

    /// Append a server log line (`[6, text]`).
    pub fn log(self, text: &str) -> Self {
        self.raw(json!([6, text]))
    }

    /// Append any instruction verbatim.
    pub fn raw(mut self, step: Value) -> Self {
        self.steps.push(step);
        self
    }

    /// The payload document as JSON.
    pub fn to_json(&self) -> Value {
        let mut root = vec![json!(1)];
        root.extend(self.steps.iter().cloned());
        json!({"name": self.name, "step": root})
    }

    /// Serialized payload document, as carried inside an envelope.
    pub fn build(&self) -> String {
        self.to_json().to_string()
    }
}

/// `[2, key]` reference expression for use inside payload arguments.
pub fn dep(key: &str) -> Value {
    json!([2, key])
}

/// Builds a dependency list.
#[derive(Debug, Clone, Default)]
pub struct DependenciesBuilder {
    entries: Vec<Value>,
}

impl DependenciesBuilder {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional literal (key = its index).
    pub fn positional(mut self, value: Value) -> Self {
        self.entries.push(value);
        self
    }

    /// `{"id": key, "value": value}`.
    pub fn literal(mut self, key: &str, value: Value) -> Self {
        self.entries.push(json!({"id": key, "value": value}));
        self
    }

    /// `{"id": key, "ref": target}`.
    pub fn reference(mut self, key: &str, target: &str) -> Self {
        self.entries.push(json!({"id": key, "ref": target}));
        self
    }

    /// The list.
    pub fn build(&self) -> Value {
        Value::Array(self.entries.clone())
    }
}
