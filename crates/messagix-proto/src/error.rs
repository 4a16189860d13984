// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Server-classified application errors.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::wire::has_error_marker;

/// Top-level error object returned in place of a GraphQL response.
///
/// Identity is the numeric code alone: two errors with the same code are equal
/// whatever their summary or description says. Callers classify errors
/// (unauthorized, server unavailable, ...) by comparing against code sentinels
/// such as [`ProtocolError::NOT_LOGGED_IN`], never by parsing message text.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {description}")]
pub struct ProtocolError {
    /// Numeric error code.
    #[serde(rename = "error")]
    pub code: i64,
    /// Short human summary.
    #[serde(rename = "errorSummary", default)]
    pub summary: String,
    /// Human description.
    #[serde(rename = "errorDescription", default)]
    pub description: String,
    /// Optional redirect target (e.g. a login or checkpoint page).
    #[serde(rename = "redirectTo", default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl ProtocolError {
    /// Session is not logged in / credentials are no longer valid.
    pub const NOT_LOGGED_IN: ProtocolError = ProtocolError::from_code(1357001);

    /// Code-only sentinel, for comparisons.
    pub const fn from_code(code: i64) -> Self {
        Self {
            code,
            summary: String::new(),
            description: String::new(),
            redirect_to: None,
        }
    }

    /// Detect a top-level error object in a (prefix-stripped) response body.
    ///
    /// Returns `Some` only when the body starts with the error marker, parses,
    /// and carries a non-zero code. Anything else is left for envelope parsing.
    pub fn detect(body: &[u8]) -> Option<Self> {
        if !has_error_marker(body) {
            return None;
        }
        serde_json::from_slice::<ProtocolError>(body)
            .ok()
            .filter(|err| err.code != 0)
    }
}

impl PartialEq for ProtocolError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for ProtocolError {}

impl Hash for ProtocolError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}
