use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn make_response(content: serde_json::Value, stop_reason: &str) -> String {
    json!({
        "id": "msg_123",
        "type": "message",
        "role": "assistant",
        "content": content,
        "model": "claude-sonnet-4-5-20250929",
        "stop_reason": stop_reason,
        "usage": { "input_tokens": 100, "output_tokens": 50 }
    })
    .to_string()
}

fn timeouts() -> LlmTimeouts {
    LlmTimeouts { request_secs: 5, connect_secs: 1 }
}

#[test]
fn parse_text_response() {
    let resp = parse_response(&make_response(json!([{ "type": "text", "text": "Hello world" }]), "end_turn")).unwrap();
    assert_eq!(resp.text, "Hello world");
    assert_eq!(resp.model, "claude-sonnet-4-5-20250929");
    assert!(!resp.truncated);
    assert_eq!(resp.input_tokens, 100);
    assert_eq!(resp.output_tokens, 50);
}

#[test]
fn parse_joins_text_blocks_and_skips_others() {
    let resp = parse_response(&make_response(
        json!([
            { "type": "thinking", "thinking": "hmm" },
            { "type": "text", "text": "{\"a\":" },
            { "type": "text", "text": "1}" }
        ]),
        "max_tokens",
    ))
    .unwrap();
    assert_eq!(resp.text, "{\"a\":1}");
    assert!(resp.truncated);
}

#[test]
fn parse_rejects_garbage() {
    assert!(matches!(parse_response("not json"), Err(LlmError::ApiParse(_))));
}

#[tokio::test]
async fn complete_sends_headers_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "k"))
        .and(header("anthropic-version", API_VERSION))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(make_response(json!([{ "type": "text", "text": "ok" }]), "end_turn")),
        )
        .mount(&server)
        .await;

    let client = AnthropicClient::new("k".into(), format!("{}/v1", server.uri()), timeouts()).unwrap();
    let out = client
        .complete("m", 10, "sys", &[Message::user("hi")])
        .await
        .unwrap();
    assert_eq!(out.text, "ok");
}

#[tokio::test]
async fn complete_surfaces_non_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = AnthropicClient::new("k".into(), server.uri(), timeouts()).unwrap();
    let err = client.complete("m", 10, "", &[]).await.unwrap_err();
    assert!(matches!(err, LlmError::ApiResponse { status: 529, ref body } if body == "overloaded"));
}
