//! Integration tests for the Gotify REST sink
//!
//! Tests the HTTP contract with a mock Gotify server:
//! - Endpoint and authentication header
//! - JSON body shape including extras
//! - Error scenarios (rejected token, server errors, unreachable server)

use gotify_nats_bridge::bridge::{MessageTranslator, TranslationPolicy};
use gotify_nats_bridge::sink::{GotifySink, GotifySinkConfig, MessageSink, SinkError};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> GotifySinkConfig {
    GotifySinkConfig {
        base_url: base_url.to_string(),
        app_token: "AbCdEf123".to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn notification(payload: &str) -> gotify_nats_bridge::Notification {
    MessageTranslator::translate(payload.as_bytes(), &TranslationPolicy::default()).unwrap()
}

#[tokio::test]
async fn test_posts_notification_with_app_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message"))
        .and(header("X-Gotify-Key", "AbCdEf123"))
        .and(body_json(serde_json::json!({
            "title": "hello world",
            "message": "this is **the message**",
            "priority": 10,
            "extras": {
                "client::display": {"contentType": "text/markdown"},
                "client::notification": {
                    "click": {"url": "https://google.fr"},
                    "bigImageUrl": null
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 42})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = GotifySink::new(test_config(&mock_server.uri())).unwrap();
    let result = sink
        .send_message(notification(
            r#"{"title":"hello world","message":"this is **the message**","priority":10,"url":"https://google.fr"}"#,
        ))
        .await;

    assert!(result.is_ok(), "send should succeed: {result:?}");
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gotify/message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = GotifySink::new(test_config(&format!("{}/gotify", mock_server.uri()))).unwrap();
    assert!(sink.send_message(notification(r#"{"title":"t"}"#)).await.is_ok());
}

#[tokio::test]
async fn test_rejected_token_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":"Unauthorized","errorCode":401,"errorDescription":"you need to provide a valid access token"}"#,
        ))
        .mount(&mock_server)
        .await;

    let sink = GotifySink::new(test_config(&mock_server.uri())).unwrap();
    let result = sink.send_message(notification(r#"{"title":"t"}"#)).await;

    match result {
        Err(SinkError::Rejected { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("valid access token"));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let sink = GotifySink::new(test_config(&mock_server.uri())).unwrap();
    assert!(matches!(
        sink.send_message(notification(r#"{"title":"t"}"#)).await,
        Err(SinkError::Rejected { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let sink = GotifySink::new(GotifySinkConfig {
        timeout: Duration::from_millis(500),
        ..test_config("http://127.0.0.1:1")
    })
    .unwrap();

    assert!(matches!(
        sink.send_message(notification(r#"{"title":"t"}"#)).await,
        Err(SinkError::Http(_))
    ));
}

#[test]
fn test_invalid_base_url() {
    assert!(matches!(
        GotifySink::new(test_config("not a url")),
        Err(SinkError::InvalidUrl(_))
    ));
}
