use netmcp::error::RouterError;
use netmcp::mcp::registry::{RegistryError, SessionRegistry};
use netmcp::mcp::router::Reply;
use netmcp::test_utils::test_helpers::{
    build_session, initialize_body, request_body, test_state_with_tools, tool_call_body,
    GatedTool,
};
use netmcp::tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

// Test 1: Create empty registry
#[tokio::test]
async fn test_registry_new() {
    let registry = SessionRegistry::new();

    assert!(registry.is_empty(), "New registry should be empty");
    assert!(registry.is_accepting(), "New registry should accept sessions");
    assert!(
        matches!(registry.lookup("any-id"), Err(RegistryError::NotFound(id)) if id == "any-id"),
        "Empty registry should return NotFound for any id"
    );
}

// Test 2: Create and look up a session
#[tokio::test]
async fn test_create_and_lookup() {
    let mut registry = SessionRegistry::new();
    let session = Arc::new(build_session("session-a"));

    registry
        .create(session.clone())
        .expect("Session registration should succeed");

    let found = registry.lookup("session-a").expect("Session should be found");
    assert!(Arc::ptr_eq(&found, &session), "Lookup should return the same session");
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("session-a"));
}

// Test 3: Duplicate ids are refused and the original entry is untouched
#[tokio::test]
async fn test_create_duplicate_session() {
    let mut registry = SessionRegistry::new();
    let original = Arc::new(build_session("session-a"));
    registry.create(original.clone()).unwrap();

    let result = registry.create(Arc::new(build_session("session-a")));

    assert!(
        matches!(result, Err(RegistryError::DuplicateSession(id)) if id == "session-a"),
        "Duplicate registration should fail"
    );
    let found = registry.lookup("session-a").unwrap();
    assert!(Arc::ptr_eq(&found, &original), "Original session should be kept");
    assert!(!original.is_closed());
}

// Test 4: Shutdown with two live sessions closes each engine exactly once
#[tokio::test]
async fn test_remove_all_closes_every_engine_once() {
    let mut registry = SessionRegistry::new();
    let first = Arc::new(build_session("session-a"));
    let second = Arc::new(build_session("session-b"));
    registry.create(first.clone()).unwrap();
    registry.create(second.clone()).unwrap();

    let closed = registry.remove_all().await;

    assert_eq!(closed, 2, "Both engines should be closed by remove_all");
    assert!(registry.is_empty());
    assert!(first.is_closed());
    assert!(second.is_closed());

    // A second close is a no-op: remove_all already performed the only close
    assert!(!first.engine().close());
    assert!(!second.engine().close());
}

// Test 5: Nothing is accepted after shutdown
#[tokio::test]
async fn test_registry_closed_after_remove_all() {
    let mut registry = SessionRegistry::new();
    registry.remove_all().await;

    assert!(!registry.is_accepting());
    let result = registry.create(Arc::new(build_session("late")));
    assert!(matches!(result, Err(RegistryError::Closed)));
    assert!(registry.is_empty());
}

// Test 6: Concurrent creation through the shared handle
#[tokio::test]
async fn test_shared_registry_concurrent_create() {
    let registry = SessionRegistry::shared();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let session = Arc::new(build_session(&format!("session-{}", i)));
                registry.write().await.create(session)
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().expect("Each unique id should register");
    }

    let registry = registry.read().await;
    assert_eq!(registry.len(), 16);
    let mut ids = registry.session_ids();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

// Test 7: Draining releases the registry lock before waiting on in-flight calls
#[tokio::test]
async fn test_drain_turns_requests_away_while_calls_finish() {
    let gated = GatedTool::default();
    let entered = gated.entered();
    let release = gated.release();
    let mut tools = ToolRegistry::new();
    tools.register(gated).unwrap();
    let state = test_state_with_tools(tools);

    let session_id = state
        .router
        .route_post(None, initialize_body(1))
        .await
        .unwrap()
        .session_id
        .unwrap();

    let in_flight = {
        let router = state.router.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            router
                .route_post(
                    Some(&session_id),
                    tool_call_body(2, "gated", json!({"value": "late"})),
                )
                .await
        })
    };
    entered.notified().await;

    let registry = state.registry.clone();
    let drain = tokio::spawn(async move { SessionRegistry::drain(&registry).await });

    timeout(Duration::from_secs(1), async {
        while state.registry.read().await.is_accepting() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Registry should stop accepting without waiting for the call");

    let rejected = timeout(
        Duration::from_secs(1),
        state
            .router
            .route_post(Some(&session_id), request_body(3, "ping", json!({}))),
    )
    .await
    .expect("Requests during the drain should not block on the registry");
    assert!(matches!(rejected, Err(RouterError::ShuttingDown)));
    assert!(!drain.is_finished(), "Drain should still wait on the in-flight call");

    release.notify_one();

    let closed = drain.await.unwrap();
    assert_eq!(closed, 1);

    let routed = in_flight.await.unwrap().expect("In-flight call should complete");
    assert!(matches!(routed.reply, Reply::Single(_)));
    assert!(state.registry.read().await.is_empty());
}
