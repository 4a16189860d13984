// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Response body builders.

use messagix_proto::wire::ANTI_JS_PREFIX;
use serde_json::{json, Value};

/// Builds raw GraphQL response bodies.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    document: Value,
    prefixed: bool,
}

impl ResponseBuilder {
    /// Messenger-shaped body.
    pub fn messenger(payload: &str, dependencies: Value) -> Self {
        Self::from_document(json!({"data": {"viewer": {"lightspeed_web_request": {
            "payload": payload,
            "dependencies": dependencies
        }}}}))
    }

    /// Instagram-Direct-shaped body.
    pub fn direct(payload: &str, dependencies: Value) -> Self {
        Self::from_document(json!({"data": {"lightspeed_web_request_for_igd": {
            "payload": payload,
            "dependencies": dependencies
        }}}))
    }

    /// Top-level error object.
    pub fn error(code: i64, description: &str) -> Self {
        Self::from_document(json!({
            "error": code,
            "errorSummary": "Error",
            "errorDescription": description,
            "redirectTo": null
        }))
    }

    /// Any JSON document.
    pub fn from_document(document: Value) -> Self {
        Self {
            document,
            prefixed: true,
        }
    }

    /// Drop the anti-parsing prefix (on by default).
    pub fn without_prefix(mut self) -> Self {
        self.prefixed = false;
        self
    }

    /// Body bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut body = if self.prefixed {
            ANTI_JS_PREFIX.to_vec()
        } else {
            Vec::new()
        };
        body.extend_from_slice(self.document.to_string().as_bytes());
        body
    }
}
