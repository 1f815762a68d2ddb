//! End-to-end tests of the reqwest executor against a local mock server

use serde_json::json;
use slack_web_api::{CallOptions, Error, RetryConfig, WebClientBuilder};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_form_post_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("Authorization", "Bearer xoxb-wired"))
        .and(body_string_contains("channel=C1"))
        .and(body_string_contains("text=hello"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1.2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = WebClientBuilder::new()
        .base_url(server.uri())
        .token("xoxb-wired")
        .build()
        .unwrap();

    let result = client
        .api_call(
            "chat.postMessage",
            CallOptions::new().arg("channel", "C1").arg("text", "hello"),
        )
        .await
        .unwrap();
    assert!(result.ok);
}

#[tokio::test]
async fn test_retry_after_header_parsed_from_429() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations.list"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .set_body_json(json!({"ok": false, "error": "ratelimited"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = WebClientBuilder::new()
        .base_url(server.uri())
        .token("xoxb-wired")
        .reject_rate_limited_calls(true)
        .build()
        .unwrap();

    let err = client
        .api_call("conversations.list", CallOptions::new())
        .await
        .unwrap_err();
    match err {
        Error::RateLimited { retry_after } => {
            assert_eq!(retry_after, std::time::Duration::from_secs(30));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_platform_error_over_real_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "invalid_auth"})),
        )
        .mount(&server)
        .await;

    let client = WebClientBuilder::new()
        .base_url(server.uri())
        .token("xoxb-bad")
        .build()
        .unwrap();

    let result = client.api_call("auth.test", CallOptions::new()).await.unwrap();
    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some("invalid_auth"));
}

#[tokio::test]
async fn test_connection_failure_is_a_transport_error() {
    // Nothing listens on the mock server once it is dropped. A bare (non-pooled)
    // server is required: pooled servers from `MockServer::start` keep their
    // listener alive after drop and answer 404 to unmatched requests.
    let server = MockServer::builder().start().await;
    let dead_uri = server.uri();
    drop(server);

    let client = WebClientBuilder::new()
        .base_url(dead_uri)
        .token("xoxb-wired")
        .retry_config(RetryConfig::no_retries())
        .build()
        .unwrap();

    let err = client.api_call("auth.test", CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
