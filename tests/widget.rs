//! Integration tests for the chat widget over real HTTP.
//!
//! The widget's `HttpTransport` talks either to a `wiremock` stand-in for the
//! relay, or to the real relay router served on a random port with a
//! `wiremock` upstream behind it.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_relay::client::{ChatWidget, HttpTransport, Message, Sender};
use chat_relay::config::{ApiKey, Config, KeySource, StaticCredential};
use chat_relay::relay::{create_router, AppState, UPSTREAM_ERROR_REPLY};

/// Serve the relay router on a random local port and return its chat URL.
async fn start_relay(upstream_base: &str) -> String {
    let mut config = Config::default();
    config.upstream.base_url = format!("{}/v1beta", upstream_base);

    let state = AppState {
        http_client: reqwest::Client::new(),
        config: Arc::new(config),
        credentials: Arc::new(StaticCredential::new(
            Some(ApiKey::from("widget-test-key")),
            KeySource::Literal,
        )),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind relay");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}/api/chat", addr)
}

/// Submit `text` and wait for its reply to land.
async fn exchange(widget: &ChatWidget<HttpTransport>, text: &str) -> Message {
    widget.set_input(text);
    tokio_test::assert_ok!(widget.submit().expect("submitted").await);
    widget.transcript().last().cloned().unwrap()
}

fn widget_for(url: String) -> ChatWidget<HttpTransport> {
    ChatWidget::new(HttpTransport::new(url, None).unwrap())
}

#[tokio::test]
async fn test_widget_renders_relay_reply() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "Hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Hello" })))
        .expect(1)
        .mount(&relay)
        .await;

    let widget = widget_for(format!("{}/api/chat", relay.uri()));
    let reply = exchange(&widget, "Hello").await;

    assert_eq!(reply, Message::assistant("Hello"));
    assert_eq!(widget.transcript().len(), 2);
    assert!(!widget.is_loading());
}

#[tokio::test]
async fn test_widget_missing_reply_field() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&relay)
        .await;

    let widget = widget_for(format!("{}/api/chat", relay.uri()));
    let reply = exchange(&widget, "Hello").await;

    assert_eq!(reply.text(), "No response from AI.");
}

#[tokio::test]
async fn test_widget_non_success_status() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "reply": UPSTREAM_ERROR_REPLY })),
        )
        .mount(&relay)
        .await;

    let widget = widget_for(format!("{}/api/chat", relay.uri()));
    let reply = exchange(&widget, "Hello").await;

    assert_eq!(reply.sender(), Sender::Assistant);
    assert_eq!(reply.text(), "Error: Failed to fetch AI response");
}

#[tokio::test]
async fn test_widget_unparsable_body() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&relay)
        .await;

    let widget = widget_for(format!("{}/api/chat", relay.uri()));
    let reply = exchange(&widget, "Hello").await;

    assert!(reply.text().starts_with("Error: "), "{}", reply.text());
    assert!(reply.text().len() > "Error: ".len());
}

#[tokio::test]
async fn test_widget_unreachable_relay() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let widget = widget_for(format!("http://{}/api/chat", addr));
    let reply = exchange(&widget, "Hello").await;

    assert!(reply.text().starts_with("Error: "), "{}", reply.text());
    assert!(!widget.is_loading());
}

#[tokio::test]
async fn test_widget_through_real_relay() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hi there" }] } }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let widget = widget_for(start_relay(&upstream.uri()).await);
    let reply = exchange(&widget, "Hello").await;

    let transcript = widget.transcript();
    assert_eq!(
        transcript.messages(),
        &[Message::user("Hello"), Message::assistant("Hi there")]
    );
    assert_eq!(reply, Message::assistant("Hi there"));
    upstream.verify().await;
}

#[tokio::test]
async fn test_widget_through_real_relay_upstream_failure() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&upstream)
        .await;

    let widget = widget_for(start_relay(&upstream.uri()).await);
    let reply = exchange(&widget, "Hello").await;

    assert_eq!(reply.text(), "Error: Failed to fetch AI response");
}
