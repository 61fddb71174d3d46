use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

async fn client(server: &MockServer) -> ChatClient {
    let http = HttpClient::new(&server.uri()).expect("http");
    http.header().sync(Some("tok"));
    ChatClient::new(http)
}

#[tokio::test]
async fn send_returns_response_and_caches_both_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"message": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi!", "timestamp": "2024-01-01T00:00:00"})))
        .mount(&server)
        .await;

    let chat = client(&server).await;
    assert_eq!(chat.send("hello").await.expect("send"), "hi!");
    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[1].content, "hi!");
}

#[tokio::test]
async fn send_accepts_legacy_message_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "legacy"})))
        .mount(&server)
        .await;

    assert_eq!(client(&server).await.send("x").await.expect("send"), "legacy");
}

#[tokio::test]
async fn send_without_text_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(matches!(client(&server).await.send("x").await, Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn plan_reuses_assigned_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/plan"))
        .and(body_json(json!({"message": "first"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assistant_response": "ok", "actions": [], "results": [], "errors": [], "session_id": "s-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ai/plan"))
        .and(body_json(json!({"message": "second", "session_id": "s-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assistant_response": "again", "session_id": "s-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chat = client(&server).await;
    chat.plan("first").await.expect("first");
    assert_eq!(chat.session_id().as_deref(), Some("s-1"));
    let second = chat.plan("second").await.expect("second");
    assert_eq!(second.assistant_response, "again");
    assert_eq!(chat.messages().len(), 4);

    chat.reset();
    assert!(chat.session_id().is_none());
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn failed_plan_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/plan"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "Too many AI requests", "code": "E_RATE_LIMITED"})))
        .mount(&server)
        .await;

    let chat = client(&server).await;
    let err = chat.plan("hi").await.unwrap_err();
    assert_eq!(err.user_message(), "Too many AI requests");
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn cancelled_plan_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/plan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"assistant_response": "late", "session_id": "s-9"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let chat = client(&server).await;
    let cancel = CancellationToken::new();
    let pending = {
        let chat = chat.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { chat.plan_with("hi", Some(cancel)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    assert!(matches!(pending.await.expect("join"), Err(ClientError::Cancelled)));
    assert!(chat.session_id().is_none());
    assert!(chat.messages().is_empty());
}

#[test]
fn resume_sets_session_id() {
    let http = HttpClient::new("http://localhost:5000").expect("http");
    let chat = ChatClient::resume(http, "abc");
    assert_eq!(chat.session_id().as_deref(), Some("abc"));
}
