use netmcp::test_utils::test_helpers::StaticResolver;
use netmcp::tools::{
    DnsLookupTool, HostResolver, SystemResolver, ToolCallOutcome, ToolOutput, ToolRegistry,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::Ordering;

fn args(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn registry_with(resolver: StaticResolver) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(DnsLookupTool::new(resolver)).unwrap();
    tools
}

#[tokio::test]
async fn test_lookup_returns_first_address() {
    let resolver = StaticResolver::default().with_entry("example.com", "93.184.215.14", 4);
    let tools = registry_with(resolver);

    let outcome = tools
        .call("dns-lookup", args(json!({"host": "example.com"})))
        .await;

    assert_eq!(
        outcome,
        ToolCallOutcome::Completed(ToolOutput::Success(json!({
            "address": "93.184.215.14",
            "family": 4
        })))
    );
}

#[tokio::test]
async fn test_lookup_failure_is_data() {
    let resolver = StaticResolver::default();
    let lookups = resolver.lookups();
    let tools = registry_with(resolver);

    let outcome = tools
        .call("dns-lookup", args(json!({"host": "nowhere.test"})))
        .await;

    let ToolCallOutcome::Completed(output) = outcome else {
        panic!("resolution failure should still complete the call");
    };
    assert!(output.is_failure());

    let value = output.into_value();
    assert_eq!(value["type"], "error");
    assert_eq!(value["value"]["code"], "ENOTFOUND");
    assert_eq!(value["value"]["hostname"], "nowhere.test");
    assert!(value["value"]["message"].as_str().unwrap().contains("nowhere.test"));
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_host_argument_skips_resolver() {
    let resolver = StaticResolver::default();
    let lookups = resolver.lookups();
    let tools = registry_with(resolver);

    for arguments in [json!({}), json!({"host": ""}), json!({"host": ["a"]})] {
        let outcome = tools.call("dns-lookup", args(arguments.clone())).await;
        assert!(
            matches!(outcome, ToolCallOutcome::InvalidArguments(_)),
            "{} should be rejected",
            arguments
        );
    }

    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_system_resolver_localhost() {
    let info = SystemResolver
        .lookup("localhost")
        .await
        .expect("localhost should resolve");

    assert!(info.family == 4 || info.family == 6);
    assert!(info.address == "127.0.0.1" || info.address == "::1");
}

#[tokio::test]
async fn test_default_tool_reports_unresolvable_host() {
    let tools = ToolRegistry::with_default_tools().unwrap();

    let outcome = tools
        .call("dns-lookup", args(json!({"host": "this-host-does-not-exist.invalid"})))
        .await;

    let value = match outcome {
        ToolCallOutcome::Completed(ToolOutput::Failure(value)) => value,
        other => panic!("expected a failure payload, got {:?}", other),
    };
    assert_eq!(value["hostname"], "this-host-does-not-exist.invalid");
    assert_eq!(value["code"], "ENOTFOUND");
}
