//! Dispatcher behavior: retry classes, terminal outcomes, request building

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use slack_web_api::{
    ArgValue, CallOptions, Error, RequestBody, RetryConfig, WebClientBuilder,
};

use crate::support::mock_executor::{init_tracing, MockExecutor, Scripted};

fn fast_retries(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay: Duration::from_millis(1),
        multiplier: 2.0,
        max_delay: Duration::from_millis(10),
        jitter: false,
    }
}

fn client_with(executor: Arc<MockExecutor>, retry: RetryConfig) -> slack_web_api::WebClient {
    WebClientBuilder::new()
        .token("xoxb-test")
        .executor(executor)
        .retry_config(retry)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_platform_error_resolves_not_rejects() {
    let executor = Arc::new(MockExecutor::new(vec![Scripted::status(
        200,
        r#"{"ok":false,"error":"invalid_auth"}"#,
    )]));
    let client = client_with(executor.clone(), fast_retries(3));

    let result = client.api_call("auth.test", CallOptions::new()).await.unwrap();
    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some("invalid_auth"));
    // Semantic failures are not retried.
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn test_persistent_transport_failure_makes_exactly_max_attempts() {
    init_tracing();
    let executor = Arc::new(
        MockExecutor::new(vec![]).with_fallback(Scripted::TransportFail("connection reset".into())),
    );
    let client = client_with(executor.clone(), fast_retries(4));

    let err = client
        .api_call("chat.postMessage", CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(executor.calls(), 4);
}

#[tokio::test]
async fn test_server_error_retried_until_success() {
    let executor = Arc::new(MockExecutor::new(vec![
        Scripted::status(503, "service unavailable"),
        Scripted::status(502, "bad gateway"),
        Scripted::ok(json!({"ok": true})),
    ]));
    let client = client_with(executor.clone(), fast_retries(5));

    let result = client.api_call("auth.test", CallOptions::new()).await.unwrap();
    assert!(result.ok);
    assert_eq!(executor.calls(), 3);
}

#[tokio::test]
async fn test_client_error_is_terminal_without_retry() {
    let executor = Arc::new(MockExecutor::new(vec![Scripted::status(404, "not found")]));
    let client = client_with(executor.clone(), fast_retries(5));

    let err = client.api_call("auth.test", CallOptions::new()).await.unwrap_err();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn test_unparseable_envelope_is_a_parse_error() {
    let executor = Arc::new(MockExecutor::new(vec![Scripted::status(200, "<html>")]));
    let client = client_with(executor.clone(), fast_retries(3));

    let err = client.api_call("auth.test", CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[tokio::test]
async fn test_bearer_token_and_form_body_attached() {
    let executor =
        Arc::new(MockExecutor::new(vec![Scripted::ok(json!({"ok": true}))]));
    let client = client_with(executor.clone(), fast_retries(1));

    client
        .api_call(
            "chat.postMessage",
            CallOptions::new().arg("channel", "C1").arg("text", "hi"),
        )
        .await
        .unwrap();

    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.url.ends_with("/chat.postMessage"));
    assert!(request
        .headers
        .iter()
        .any(|(k, v)| k == "Authorization" && v == "Bearer xoxb-test"));
    match &request.body {
        RequestBody::Form(fields) => {
            assert!(fields.contains(&("channel".to_string(), "C1".to_string())));
            assert!(fields.contains(&("text".to_string(), "hi".to_string())));
        }
        RequestBody::Multipart(_) => panic!("expected form body"),
    }
}

#[tokio::test]
async fn test_binary_argument_switches_to_multipart() {
    let executor =
        Arc::new(MockExecutor::new(vec![Scripted::ok(json!({"ok": true}))]));
    let client = client_with(executor.clone(), fast_retries(1));

    client
        .api_call(
            "files.upload",
            CallOptions::new().arg("channels", "C1").arg(
                "file",
                ArgValue::Binary {
                    filename: "notes.txt".to_string(),
                    bytes: b"hello".to_vec(),
                },
            ),
        )
        .await
        .unwrap();

    let requests = executor.requests();
    assert!(matches!(requests[0].body, RequestBody::Multipart(_)));
}

#[tokio::test]
async fn test_warning_and_extra_fields_preserved() {
    let executor = Arc::new(MockExecutor::new(vec![Scripted::ok(json!({
        "ok": true,
        "warning": "superfluous_charset",
        "ts": "1234.5678"
    }))]));
    let client = client_with(executor, fast_retries(1));

    let result = client.api_call("chat.postMessage", CallOptions::new()).await.unwrap();
    assert_eq!(result.warning.as_deref(), Some("superfluous_charset"));
    assert_eq!(
        result.extra.get("ts").and_then(|v| v.as_str()),
        Some("1234.5678")
    );
}
