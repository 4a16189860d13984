// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Response framing constants and helpers.

/// Prefix the server prepends to every GraphQL response to defeat naive
/// script inclusion.
pub const ANTI_JS_PREFIX: &[u8] = b"for (;;);";

/// Leading bytes of a top-level error object.
pub const ERROR_MARKER: &[u8] = br#"{"error""#;

/// Default bound for diagnostic body dumps (bytes of raw body).
pub const DEFAULT_DUMP_LIMIT: usize = 4096;

/// Strip [`ANTI_JS_PREFIX`] if present.
pub fn strip_anti_js_prefix(body: &[u8]) -> &[u8] {
    body.strip_prefix(ANTI_JS_PREFIX).unwrap_or(body)
}

/// Whether `body` starts with [`ERROR_MARKER`].
pub fn has_error_marker(body: &[u8]) -> bool {
    body.starts_with(ERROR_MARKER)
}

/// Hex dump of at most `limit` leading bytes of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedDump {
    /// Lowercase hex of the retained bytes.
    pub hex: String,
    /// Full length of the body the dump was taken from.
    pub total_len: usize,
    /// Whether bytes were dropped.
    pub truncated: bool,
}

impl BoundedDump {
    /// Dump the first `limit` bytes of `body`.
    pub fn new(body: &[u8], limit: usize) -> Self {
        let kept = &body[..body.len().min(limit)];
        Self {
            hex: hex::encode(kept),
            total_len: body.len(),
            truncated: kept.len() < body.len(),
        }
    }
}

impl std::fmt::Display for BoundedDump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.truncated {
            write!(f, "{}… ({} bytes total)", self.hex, self.total_len)
        } else {
            f.write_str(&self.hex)
        }
    }
}
