// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end request orchestration against a scripted transport.

use std::sync::Arc;

use messagix_client::proto::graphql::{LS_REQUEST, LS_REQUEST_IG};
use messagix_client::proto::{LsSyncVariables, Platform, ProtocolError, QueueName};
use messagix_client::{
    CallState, Client, ClientConfig, ClientError, ErrorClass, HttpResponse, StaticSession,
    TableStore, TransportError, Value,
};
use messagix_dry_tests::{
    dep, fixture_registry, DependenciesBuilder, MockTransport, PayloadBuilder, ResponseBuilder,
    FIXTURE_DOC_ID, FIXTURE_IG_DOC_ID, FIXTURE_SEARCH_OP,
};
use messagix_lightspeed::LsError;
use serde_json::json;

fn client(platform: Platform, transport: &MockTransport) -> Client<MockTransport> {
    let mut config = ClientConfig::for_platform(platform);
    config.device_id = "device-1".into();
    config.version_id = "9876".into();
    config.dump_limit = 32;
    let session = StaticSession::new(
        vec![("fb_dtsg".into(), "dtsg-token".into())],
        vec![("user-agent".into(), "messagix-tests".into())],
    )
    .with_cookie("c_user", "100");
    Client::new(config, transport.clone(), fixture_registry(), Arc::new(session))
}

fn form_value(form: &[(String, String)], name: &str) -> Option<String> {
    form.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

fn thread_payload() -> (String, serde_json::Value) {
    let payload = PayloadBuilder::new()
        .upsert("threads", "t1", json!({"name": dep("title"), "unread": 2}))
        .upsert("messages", "m1", json!({"thread": "t1", "text": "hi"}))
        .build();
    let deps = DependenciesBuilder::new()
        .literal("title", json!("general"))
        .build();
    (payload, deps)
}

fn assert_thread_store(store: &TableStore) {
    assert_eq!(store.row_count(), 2);
    assert_eq!(
        store.cell("threads", "t1", "name"),
        Some(&Value::Text("general".into()))
    );
    assert_eq!(store.cell("threads", "t1", "unread"), Some(&Value::Int(2)));
    assert_eq!(
        store.cell("messages", "m1", "text"),
        Some(&Value::Text("hi".into()))
    );
}

// ─── platform envelopes ────────────────────────────────────────────────────

#[tokio::test]
async fn messenger_envelope_decodes_to_the_described_rows() {
    let (payload, deps) = thread_payload();
    let transport = MockTransport::new();
    transport.respond(ResponseBuilder::messenger(&payload, deps).build());

    let store = client(Platform::Messenger, &transport)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap();
    assert_thread_store(&store);
}

#[tokio::test]
async fn direct_envelope_decodes_identically() {
    let (payload, deps) = thread_payload();
    let messenger = MockTransport::new();
    messenger.respond(ResponseBuilder::messenger(&payload, deps.clone()).build());
    let direct = MockTransport::new();
    direct.respond(ResponseBuilder::direct(&payload, deps).build());

    let a = client(Platform::Messenger, &messenger)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap();
    let b = client(Platform::Instagram, &direct)
        .execute(LS_REQUEST_IG, &json!({}))
        .await
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.compute_hash().unwrap(), b.compute_hash().unwrap());
}

#[tokio::test]
async fn prefix_is_optional() {
    let (payload, deps) = thread_payload();
    let transport = MockTransport::new();
    transport.respond(
        ResponseBuilder::messenger(&payload, deps)
            .without_prefix()
            .build(),
    );
    let store = client(Platform::Facebook, &transport)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap();
    assert_thread_store(&store);
}

#[tokio::test]
async fn wrong_platform_shape_is_an_envelope_mismatch_with_bounded_dump() {
    let (payload, deps) = thread_payload();
    let transport = MockTransport::new();
    transport.respond(ResponseBuilder::direct(&payload, deps).build());

    let err = client(Platform::Messenger, &transport)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap_err();
    let ClientError::EnvelopeMismatch(mismatch) = &err else {
        panic!("expected envelope mismatch, got {err:?}");
    };
    assert!(mismatch.dump.truncated);
    assert_eq!(mismatch.dump.hex.len(), 64);
    assert_eq!(err.class(), ErrorClass::EnvelopeMismatch);
    assert_eq!(err.terminal_state(), CallState::EnvelopeMismatch);
    assert!(!err.is_retryable());
}

// ─── error classification ──────────────────────────────────────────────────

#[tokio::test]
async fn error_object_is_classified_by_code() {
    let transport = MockTransport::new();
    transport
        .respond(ResponseBuilder::error(1357001, "Please log in.").build())
        .respond(ResponseBuilder::error(1357001, "Entirely different text").build());
    let client = client(Platform::Messenger, &transport);

    let first = client.execute(LS_REQUEST, &json!({})).await.unwrap_err();
    let second = client.execute(LS_REQUEST, &json!({})).await.unwrap_err();

    let (Some(a), Some(b)) = (first.protocol_error(), second.protocol_error()) else {
        panic!("expected protocol errors: {first:?} / {second:?}");
    };
    assert_eq!(a.code, 1357001);
    assert_ne!(a.description, b.description);
    assert_eq!(a, b);
    assert_eq!(a, &ProtocolError::NOT_LOGGED_IN);
    assert_eq!(first.class(), ErrorClass::Protocol);
}

#[tokio::test]
async fn unknown_operation_fails_before_io() {
    let transport = MockTransport::new();
    let err = client(Platform::Messenger, &transport)
        .execute("NoSuchQuery", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UnknownOperation(ref name) if name == "NoSuchQuery"));
    assert_eq!(err.terminal_state(), CallState::Rejected);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn transport_faults_are_retryable() {
    let transport = MockTransport::new();
    transport
        .fail(TransportError::Network("connection reset".into()))
        .respond_with(HttpResponse {
            status: 503,
            headers: Vec::new(),
            body: b"unavailable".to_vec(),
        });
    let client = client(Platform::Messenger, &transport);

    for _ in 0..2 {
        let err = client.execute(LS_REQUEST, &json!({})).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Transport, "{err}");
        assert_eq!(err.terminal_state(), CallState::TransportError);
        assert!(err.is_retryable());
    }
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn unresolved_dependency_returns_no_store() {
    let payload = PayloadBuilder::new()
        .upsert("threads", "t1", json!({"name": "ok"}))
        .upsert("threads", "t2", json!({"name": dep("missing")}))
        .build();
    let transport = MockTransport::new();
    transport.respond(ResponseBuilder::messenger(&payload, json!([])).build());

    let err = client(Platform::Messenger, &transport)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Payload(LsError::UnresolvedDependency { ref key, .. }) if key == "missing"
    ));
    assert_eq!(err.terminal_state(), CallState::DecodeFailed);
}

#[tokio::test]
async fn malformed_payload_text_is_a_payload_error() {
    let transport = MockTransport::new();
    transport.respond(ResponseBuilder::messenger("{not json", json!([])).build());
    let err = client(Platform::Messenger, &transport)
        .execute(LS_REQUEST, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.terminal_state(), CallState::PayloadMalformed);
}

// ─── request framing ───────────────────────────────────────────────────────

#[tokio::test]
async fn request_carries_operation_tags_session_and_headers() {
    let transport = MockTransport::new();
    transport.respond_with(HttpResponse {
        status: 200,
        headers: vec![("set-cookie".into(), "xs=fresh; Path=/".into())],
        body: ResponseBuilder::messenger(&PayloadBuilder::new().build(), json!(null)).build(),
    });
    let client = client(Platform::Messenger, &transport);
    client
        .execute(FIXTURE_SEARCH_OP, &json!({"query": "bob"}))
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.url, "https://www.messenger.com/api/graphql/");
    assert_eq!(request.header("x-fb-friendly-name"), Some("MWChatSearchQuery"));
    assert_eq!(request.header("referer"), Some("https://www.messenger.com/t/"));
    assert_eq!(request.header("origin"), Some("https://www.messenger.com"));
    assert_eq!(request.header("sec-fetch-site"), Some("same-origin"));
    assert_eq!(request.header("user-agent"), Some("messagix-tests"));
    assert_eq!(request.header("cookie"), Some("c_user=100"));

    let form = transport.form(0);
    assert_eq!(form_value(&form, "fb_dtsg").as_deref(), Some("dtsg-token"));
    assert_eq!(form_value(&form, "server_timestamps").as_deref(), Some("true"));
    assert_eq!(form_value(&form, "__jssesw").as_deref(), Some("1"));
    assert_eq!(
        form_value(&form, "variables").as_deref(),
        Some(r#"{"query":"bob"}"#)
    );

    transport.respond(ResponseBuilder::messenger(&PayloadBuilder::new().build(), json!([])).build());
    client.execute(LS_REQUEST, &json!({})).await.unwrap();
    assert_eq!(
        transport.requests()[1].header("cookie"),
        Some("c_user=100; xs=fresh")
    );
}

#[tokio::test]
async fn ls_request_wraps_variables_and_picks_the_platform_operation() {
    let empty = PayloadBuilder::new().build();
    let transport = MockTransport::new();
    transport
        .respond(ResponseBuilder::direct(&empty, json!([])).build())
        .respond(ResponseBuilder::direct(&empty, json!([])).build());
    let client = client(Platform::Instagram, &transport);

    let sync = LsSyncVariables {
        database: 1,
        epoch_id: 42,
        last_applied_cursor: None,
        sync_params: Some("{}".into()),
        version: 6,
    };
    client.sync(&sync).await.unwrap();
    client.sync(&sync).await.unwrap();

    for (index, expected_id) in [(0, 0), (1, 1)] {
        let form = transport.form(index);
        assert_eq!(form_value(&form, "doc_id").as_deref(), Some(FIXTURE_IG_DOC_ID));
        let vars: serde_json::Value =
            serde_json::from_str(&form_value(&form, "variables").unwrap()).unwrap();
        assert_eq!(vars["deviceId"], "device-1");
        assert_eq!(vars["includeChatVisibility"], false);
        assert_eq!(vars["requestId"], expected_id);
        assert_eq!(vars["requestType"], 1);
        let inner: serde_json::Value =
            serde_json::from_str(vars["requestPayload"].as_str().unwrap()).unwrap();
        assert_eq!(inner["database"], 1);
        assert_eq!(inner["last_applied_cursor"], serde_json::Value::Null);
    }
}

#[tokio::test]
async fn execute_tasks_sends_a_labeled_batch() {
    let transport = MockTransport::new();
    transport.respond(
        ResponseBuilder::messenger(
            &PayloadBuilder::new()
                .upsert("messages", "m9", json!({"text": "sent", "otid": "123"}))
                .build(),
            json!([]),
        )
        .build(),
    );
    let client = client(Platform::Messenger, &transport);

    let tasks = (0..3)
        .map(|i| {
            client.create_task(
                "SendMessageTask",
                &json!({"thread_id": 5, "otid": format!("{i}"), "text": "sent"}),
                QueueName::Plain("5".into()),
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let ids: Vec<u64> = tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let store = client.execute_tasks(tasks).await.unwrap();
    assert_eq!(store.row_count(), 1);

    let form = transport.form(0);
    assert_eq!(form_value(&form, "doc_id").as_deref(), Some(FIXTURE_DOC_ID));
    let vars: serde_json::Value =
        serde_json::from_str(&form_value(&form, "variables").unwrap()).unwrap();
    assert_eq!(vars["requestType"], 3);
    let batch: serde_json::Value =
        serde_json::from_str(vars["requestPayload"].as_str().unwrap()).unwrap();
    assert_eq!(batch["version_id"], "9876");
    assert_eq!(batch["tasks"].as_array().map(Vec::len), Some(3));
    for task in batch["tasks"].as_array().unwrap() {
        assert_eq!(task["label"], "46");
        assert_eq!(task["queue_name"], "5");
        assert!(task["failure_count"].is_null());
    }
}

#[tokio::test]
async fn unknown_task_label_is_a_caller_error() {
    let transport = MockTransport::new();
    let client = client(Platform::Messenger, &transport);
    let err = client
        .create_task("TeleportTask", &json!({}), "q".into())
        .unwrap_err();
    assert!(matches!(err, ClientError::UnknownTaskLabel(_)));
    assert_eq!(err.class(), ErrorClass::Caller);
    assert_eq!(client.task_encoder().counter().peek(), 0);
    assert_eq!(transport.request_count(), 0);
}
