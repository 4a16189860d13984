// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation registry fixture.

use std::sync::Arc;

use messagix_proto::graphql::{LS_REQUEST, LS_REQUEST_IG};
use messagix_proto::{GraphQLOperation, OperationRegistry, OperationTable};

/// Document id of the fixture `LSGraphQLRequest`.
pub const FIXTURE_DOC_ID: &str = "7357766267580153";
/// Document id of the fixture `LSGraphQLRequestIG`.
pub const FIXTURE_IG_DOC_ID: &str = "6195354443842040";
/// A non-LightSpeed operation carrying a session-switch token.
pub const FIXTURE_SEARCH_OP: &str = "MWChatSearchQuery";

/// Registry with both LightSpeed operations and one plain operation.
pub fn fixture_registry() -> Arc<dyn OperationRegistry> {
    let table: OperationTable = [
        GraphQLOperation {
            name: LS_REQUEST.into(),
            caller_class: "RelayModern".into(),
            friendly_name: "LSPlatformGraphQLLightspeedRequestQuery".into(),
            doc_id: FIXTURE_DOC_ID.into(),
            jssesw: None,
        },
        GraphQLOperation {
            name: LS_REQUEST_IG.into(),
            caller_class: "RelayModern".into(),
            friendly_name: "LSPlatformGraphQLLightspeedRequestForIGDQuery".into(),
            doc_id: FIXTURE_IG_DOC_ID.into(),
            jssesw: None,
        },
        GraphQLOperation {
            name: FIXTURE_SEARCH_OP.into(),
            caller_class: "RelayModern".into(),
            friendly_name: "MWChatSearchQuery".into(),
            doc_id: "24935117046060391".into(),
            jssesw: Some("1".into()),
        },
    ]
    .into_iter()
    .collect();
    Arc::new(table)
}
