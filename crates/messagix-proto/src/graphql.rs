// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! GraphQL operation descriptors, the registry port, and outgoing request
//! framing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::platform::{Endpoints, Platform};

/// LightSpeed request operation on Messenger and Facebook.
pub const LS_REQUEST: &str = "LSGraphQLRequest";
/// LightSpeed request operation on Instagram.
pub const LS_REQUEST_IG: &str = "LSGraphQLRequestIG";

/// Operation used for LightSpeed requests on `platform`.
pub fn ls_request_operation(platform: Platform) -> &'static str {
    if platform.is_messenger() {
        LS_REQUEST
    } else {
        LS_REQUEST_IG
    }
}

/// Statically registered GraphQL document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLOperation {
    /// Lookup name.
    pub name: String,
    /// `fb_api_caller_class` tag.
    pub caller_class: String,
    /// `fb_api_req_friendly_name` tag.
    pub friendly_name: String,
    /// Persisted document id.
    pub doc_id: String,
    /// Optional session-switch token (`__jssesw`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jssesw: Option<String>,
}

/// Read-only operation registry.
///
/// Supplied by the application; looked up by exact name.
pub trait OperationRegistry: Send + Sync {
    /// Look up an operation by name.
    fn operation(&self, name: &str) -> Option<&GraphQLOperation>;

    /// All registered operations, sorted by name.
    fn operations(&self) -> Vec<&GraphQLOperation>;
}

/// Map-backed [`OperationRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTable {
    ops: BTreeMap<String, GraphQLOperation>,
}

impl OperationTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `op`, replacing any operation of the same name.
    pub fn insert(&mut self, op: GraphQLOperation) -> Option<GraphQLOperation> {
        self.ops.insert(op.name.clone(), op)
    }

    /// Parse a JSON list of operations.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let ops: Vec<GraphQLOperation> = serde_json::from_str(text)?;
        Ok(ops.into_iter().collect())
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl FromIterator<GraphQLOperation> for OperationTable {
    fn from_iter<I: IntoIterator<Item = GraphQLOperation>>(iter: I) -> Self {
        let mut table = Self::new();
        for op in iter {
            table.insert(op);
        }
        table
    }
}

impl OperationRegistry for OperationTable {
    fn operation(&self, name: &str) -> Option<&GraphQLOperation> {
        self.ops.get(name)
    }

    fn operations(&self) -> Vec<&GraphQLOperation> {
        self.ops.values().collect()
    }
}

/// Content type of every GraphQL POST.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Outgoing form POST for one operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// POST target.
    pub url: String,
    /// Header pairs, in send order.
    pub headers: Vec<(String, String)>,
    /// Form fields, in encode order.
    pub form: Vec<(String, String)>,
}

impl RequestEnvelope {
    /// Frame `op` with already-serialized `variables`.
    ///
    /// `session_form` and `session_headers` come first so operation fields
    /// are appended after the session's own.
    pub fn build(
        op: &GraphQLOperation,
        variables: String,
        endpoints: &Endpoints,
        session_form: Vec<(String, String)>,
        session_headers: Vec<(String, String)>,
    ) -> Self {
        let mut form = session_form;
        form.extend([
            ("fb_api_caller_class".to_owned(), op.caller_class.clone()),
            ("fb_api_req_friendly_name".to_owned(), op.friendly_name.clone()),
            ("variables".to_owned(), variables),
            ("server_timestamps".to_owned(), "true".to_owned()),
            ("doc_id".to_owned(), op.doc_id.clone()),
        ]);
        if let Some(token) = &op.jssesw {
            form.push(("__jssesw".to_owned(), token.clone()));
        }

        let mut headers = session_headers;
        for (name, value) in [
            ("content-type", FORM_CONTENT_TYPE.to_owned()),
            ("x-fb-friendly-name", op.friendly_name.clone()),
            ("sec-fetch-dest", "empty".to_owned()),
            ("sec-fetch-mode", "cors".to_owned()),
            ("sec-fetch-site", "same-origin".to_owned()),
            ("origin", endpoints.base_url.clone()),
            ("referer", format!("{}/", endpoints.messages)),
        ] {
            set_header(&mut headers, name, value);
        }

        Self {
            url: endpoints.graphql.clone(),
            headers,
            form,
        }
    }

    /// First form value named `name`.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// URL-encoded form body.
    pub fn encode_body(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.form)
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_owned(), value));
}

/// Kind of LightSpeed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LsRequestType {
    /// Database sync.
    Sync = 1,
    /// Task batch.
    Task = 3,
}

impl Serialize for LsRequestType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Variables of a LightSpeed request operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LsRequestVariables {
    /// Device id from the client config.
    pub device_id: String,
    /// Always `false`.
    pub include_chat_visibility: bool,
    /// Per-client request sequence number.
    pub request_id: u64,
    /// Inner variables, JSON-encoded.
    pub request_payload: String,
    /// Request kind.
    pub request_type: LsRequestType,
}

/// Inner variables of a database sync request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsSyncVariables {
    /// Database (sync group) number.
    pub database: i64,
    /// Epoch id of the request.
    pub epoch_id: i64,
    /// Cursor of the last applied sync; `null` on first sync.
    pub last_applied_cursor: Option<String>,
    /// Opaque sync parameters.
    pub sync_params: Option<String>,
    /// Schema version.
    pub version: i64,
}
