//! Handshake gate and session routing

use netmcp::error::RouterError;
use netmcp::mcp::message::{JsonRpcMessage, RequestId};
use netmcp::mcp::router::Reply;
use netmcp::mcp::SessionRegistry;
use netmcp::test_utils::test_helpers::{initialize_body, request_body, test_state};
use netmcp::AppState;
use serde_json::{json, Value};
use std::collections::HashSet;

async fn initialize(state: &AppState) -> String {
    state
        .router
        .route_post(None, initialize_body(1))
        .await
        .expect("initialize should succeed")
        .session_id
        .expect("initialize should create a session")
}

fn single_result(reply: Reply) -> Value {
    match reply {
        Reply::Single(JsonRpcMessage::Response(r)) => r.result,
        other => panic!("expected a single response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_creates_registered_session() {
    let state = test_state();

    let routed = state
        .router
        .route_post(None, initialize_body(1))
        .await
        .unwrap();

    let session_id = routed.session_id.clone().expect("session id should be minted");
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
    assert!(state.registry.read().await.contains(&session_id));

    let result = single_result(routed.reply);
    assert_eq!(result["serverInfo"]["name"], "netmcp");
}

#[tokio::test]
async fn test_session_ids_are_unique() {
    let state = test_state();

    let mut ids = HashSet::new();
    for _ in 0..20 {
        ids.insert(initialize(&state).await);
    }

    assert_eq!(ids.len(), 20);
    assert_eq!(state.registry.read().await.len(), 20);
}

#[tokio::test]
async fn test_non_initialize_without_session_is_bad_request() {
    let state = test_state();

    let result = state
        .router
        .route_post(None, request_body(1, "tools/list", json!({})))
        .await;

    assert!(matches!(result, Err(RouterError::BadRequest(_))));
    assert!(state.registry.read().await.is_empty());
}

#[tokio::test]
async fn test_malformed_initialize_is_bad_request() {
    let state = test_state();

    let result = state
        .router
        .route_post(
            None,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

    assert!(matches!(result, Err(RouterError::BadRequest(_))));
    assert!(state.registry.read().await.is_empty());
}

#[tokio::test]
async fn test_unknown_session_is_invalid_session() {
    let state = test_state();
    let existing = initialize(&state).await;

    let result = state
        .router
        .route_post(Some("not-a-session"), request_body(2, "ping", json!({})))
        .await;

    assert!(matches!(result, Err(RouterError::InvalidSession(id)) if id == "not-a-session"));

    let registry = state.registry.read().await;
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&existing));
    assert!(!registry.lookup(&existing).unwrap().is_closed());
}

#[tokio::test]
async fn test_initialize_with_session_id_is_rejected() {
    let state = test_state();
    let session_id = initialize(&state).await;

    let result = state
        .router
        .route_post(Some(&session_id), initialize_body(2))
        .await;
    assert!(matches!(result, Err(RouterError::BadRequest(_))));

    let result = state
        .router
        .route_post(Some("never-issued"), initialize_body(3))
        .await;
    assert!(matches!(result, Err(RouterError::BadRequest(_))));

    assert_eq!(state.registry.read().await.len(), 1);
}

#[tokio::test]
async fn test_existing_session_forwards_to_engine() {
    let state = test_state();
    let session_id = initialize(&state).await;

    let routed = state
        .router
        .route_post(Some(&session_id), request_body(2, "tools/list", json!({})))
        .await
        .unwrap();

    assert!(routed.session_id.is_none(), "Only initialize returns a session id");
    let result = single_result(routed.reply);
    let names: Vec<_> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["dns-lookup", "echo"]);
}

#[tokio::test]
async fn test_notification_only_body_is_accepted() {
    let state = test_state();
    let session_id = initialize(&state).await;

    let routed = state
        .router
        .route_post(
            Some(&session_id),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await
        .unwrap();

    assert_eq!(routed.reply, Reply::Accepted);
    let session = state.registry.read().await.lookup(&session_id).unwrap();
    assert!(session.engine().is_initialized());
}

#[tokio::test]
async fn test_batch_replies_keep_order() {
    let state = test_state();
    let session_id = initialize(&state).await;

    let routed = state
        .router
        .route_post(
            Some(&session_id),
            json!([
                request_body(10, "ping", json!({})),
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                request_body(11, "tools/list", json!({}))
            ]),
        )
        .await
        .unwrap();

    match routed.reply {
        Reply::Batch(replies) => {
            let ids: Vec<_> = replies
                .iter()
                .map(|r| match r {
                    JsonRpcMessage::Response(r) => r.id.clone(),
                    other => panic!("unexpected {:?}", other),
                })
                .collect();
            assert_eq!(ids, vec![RequestId::Number(10.into()), RequestId::Number(11.into())]);
        }
        other => panic!("expected batch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reply_echoes_wide_and_fractional_ids() {
    let state = test_state();
    let session_id = initialize(&state).await;

    let routed = state
        .router
        .route_post(
            Some(&session_id),
            json!([
                {"jsonrpc": "2.0", "id": u64::MAX, "method": "ping"},
                {"jsonrpc": "2.0", "id": 2.5, "method": "ping"}
            ]),
        )
        .await
        .expect("ids outside i64 must not turn the body into a bad request");

    let replies = match routed.reply {
        Reply::Batch(replies) => serde_json::to_value(replies).unwrap(),
        other => panic!("expected batch, got {:?}", other),
    };
    assert_eq!(replies[0]["id"], json!(u64::MAX));
    assert_eq!(replies[0]["result"], json!({}));
    assert_eq!(replies[1]["id"], json!(2.5));
}

#[tokio::test]
async fn test_batched_initialize_creates_session() {
    let state = test_state();

    let routed = state
        .router
        .route_post(None, json!([initialize_body(1)]))
        .await
        .unwrap();

    assert!(routed.session_id.is_some());
    assert!(matches!(routed.reply, Reply::Batch(ref replies) if replies.len() == 1));
}

#[tokio::test]
async fn test_invalid_json_rpc_body_is_bad_request() {
    let state = test_state();

    let result = state.router.route_post(None, json!({"hello": "world"})).await;
    assert!(matches!(result, Err(RouterError::BadRequest(_))));

    let result = state.router.route_post(None, json!([])).await;
    assert!(matches!(result, Err(RouterError::BadRequest(_))));
}

#[tokio::test]
async fn test_get_requires_known_session() {
    let state = test_state();

    assert!(matches!(
        state.router.route_get(None).await,
        Err(RouterError::BadRequest(_))
    ));
    assert!(matches!(
        state.router.route_get(Some("unknown")).await,
        Err(RouterError::InvalidSession(_))
    ));
}

#[tokio::test]
async fn test_get_pushes_connection_established_once_per_attach() {
    use futures::StreamExt;

    let state = test_state();
    let session_id = initialize(&state).await;

    let mut attachment = state.router.route_get(Some(&session_id)).await.unwrap();
    assert_eq!(attachment.session_id, session_id);

    let first = attachment.receiver.next().await.unwrap();
    let value = serde_json::to_value(first).unwrap();
    assert_eq!(value["method"], "notifications/message");
    assert_eq!(value["params"]["data"], "SSE Connection established");

    // Nothing else is queued until another push happens
    let session = state.registry.read().await.lookup(&session_id).unwrap();
    session.notifications().push("notifications/custom", None);
    let second = attachment.receiver.next().await.unwrap();
    assert_eq!(second.method(), Some("notifications/custom"));
}

#[tokio::test]
async fn test_shutdown_stops_routing() {
    let state = test_state();
    let first = initialize(&state).await;
    let second = initialize(&state).await;

    let sessions = {
        let registry = state.registry.read().await;
        vec![
            registry.lookup(&first).unwrap(),
            registry.lookup(&second).unwrap(),
        ]
    };

    let closed = SessionRegistry::drain(&state.registry).await;
    assert_eq!(closed, 2);
    assert!(sessions.iter().all(|s| s.is_closed()));

    let result = state.router.route_post(None, initialize_body(9)).await;
    assert!(matches!(result, Err(RouterError::ShuttingDown)));

    let result = state
        .router
        .route_post(Some(&first), request_body(3, "ping", json!({})))
        .await;
    assert!(matches!(result, Err(RouterError::ShuttingDown)));
    assert!(state.registry.read().await.is_empty());
}
