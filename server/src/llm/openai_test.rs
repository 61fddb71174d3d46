use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn timeouts() -> LlmTimeouts {
    LlmTimeouts { request_secs: 5, connect_secs: 1 }
}

#[test]
fn cc_parse_text_response() {
    let json = json!({
        "model": "gpt-4o-mini",
        "choices": [{ "message": { "role": "assistant", "content": "Salam" }, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
    })
    .to_string();
    let resp = parse_chat_completions_response(&json).unwrap();
    assert_eq!(resp.text, "Salam");
    assert_eq!(resp.model, "gpt-4o-mini");
    assert!(!resp.truncated);
    assert_eq!((resp.input_tokens, resp.output_tokens), (12, 3));
}

#[test]
fn cc_parse_length_is_truncated() {
    let json = json!({
        "choices": [{ "message": { "content": "{\"assistant_" }, "finish_reason": "length" }]
    })
    .to_string();
    let resp = parse_chat_completions_response(&json).unwrap();
    assert!(resp.truncated);
    assert_eq!(resp.input_tokens, 0);
}

#[test]
fn cc_parse_null_content_is_empty() {
    let json = json!({ "choices": [{ "message": { "content": null } }] }).to_string();
    assert_eq!(parse_chat_completions_response(&json).unwrap().text, "");
}

#[test]
fn cc_parse_missing_choices() {
    let json = json!({ "model": "gpt-4o", "choices": [] }).to_string();
    assert!(matches!(parse_chat_completions_response(&json), Err(LlmError::ApiParse(_))));
}

#[test]
fn resp_parse_text_response() {
    let json = json!({
        "model": "gpt-4.1",
        "output": [
            { "type": "reasoning", "summary": [] },
            { "type": "message", "content": [{ "type": "output_text", "text": "Done!" }] }
        ],
        "usage": { "input_tokens": 7, "output_tokens": 2 }
    })
    .to_string();
    let resp = parse_responses_response(&json).unwrap();
    assert_eq!(resp.text, "Done!");
    assert_eq!((resp.input_tokens, resp.output_tokens), (7, 2));
}

#[test]
fn resp_parse_output_text_fallback_and_truncation() {
    let json = json!({
        "output_text": "Fallback text",
        "incomplete_details": { "reason": "max_output_tokens" }
    })
    .to_string();
    let resp = parse_responses_response(&json).unwrap();
    assert_eq!(resp.text, "Fallback text");
    assert!(resp.truncated);
}

#[test]
fn chat_messages_prepend_system() {
    let msgs = [Message::user("hi"), Message::assistant("hello")];
    let built = build_chat_messages("be brief", &msgs);
    assert_eq!(
        built,
        vec![
            CcMessage { role: "system", content: "be brief" },
            CcMessage { role: "user", content: "hi" },
            CcMessage { role: "assistant", content: "hello" },
        ]
    );
    assert_eq!(build_chat_messages("  ", &msgs).len(), 2);
}

#[tokio::test]
async fn chat_completions_round_trip_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk"))
        .and(body_partial_json(json!({ "model": "m", "max_tokens": 20 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "pong" }, "finish_reason": "stop" }]
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(
        "sk".into(),
        OpenAiApiMode::ChatCompletions,
        format!("{}/v1", server.uri()),
        timeouts(),
    )
    .unwrap();
    let out = client
        .complete("m", 20, "sys", &[Message::user("ping")])
        .await
        .unwrap();
    assert_eq!(out.text, "pong");
}

#[tokio::test]
async fn responses_mode_hits_responses_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({ "instructions": "sys", "max_output_tokens": 9 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output_text": "ok" })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("sk".into(), OpenAiApiMode::Responses, server.uri(), timeouts()).unwrap();
    let out = client.complete("m", 9, "sys", &[]).await.unwrap();
    assert_eq!(out.text, "ok");
}
