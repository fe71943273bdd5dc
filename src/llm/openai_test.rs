use super::*;

#[test]
fn parse_text_response() {
    let json = serde_json::json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "{\"summary\":\"ok\"}" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
    })
    .to_string();
    let resp = parse_chat_completions_response(&json).unwrap();
    assert_eq!(resp.text(), "{\"summary\":\"ok\"}");
    assert_eq!(resp.stop_reason, "end_turn");
    assert_eq!(resp.input_tokens, 10);
    assert_eq!(resp.output_tokens, 5);
}

#[test]
fn parse_truncated_response() {
    let json = serde_json::json!({
        "choices": [{ "message": { "content": "partial" }, "finish_reason": "length" }]
    })
    .to_string();
    let resp = parse_chat_completions_response(&json).unwrap();
    assert_eq!(resp.stop_reason, "max_tokens");
    assert_eq!(resp.model, "");
}

#[test]
fn parse_null_content_yields_no_blocks() {
    let json = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "stop" }]
    })
    .to_string();
    let resp = parse_chat_completions_response(&json).unwrap();
    assert!(resp.content.is_empty());
    assert_eq!(resp.text(), "");
}

#[test]
fn parse_missing_choices() {
    let json = serde_json::json!({ "model": "m", "choices": [] }).to_string();
    assert!(matches!(parse_chat_completions_response(&json), Err(LlmError::ApiParse(_))));
}

#[test]
fn parse_invalid_json() {
    assert!(matches!(parse_chat_completions_response("<html>"), Err(LlmError::ApiParse(_))));
}

#[test]
fn messages_prepend_system_prompt() {
    let messages = vec![Message::user("Analyze these 2 leads")];
    let built = build_chat_completions_messages("You are an analyst.", &messages);
    assert_eq!(built.len(), 2);
    assert_eq!(built[0].role, "system");
    assert_eq!(built[1].role, "user");
    assert_eq!(built[1].content, "Analyze these 2 leads");
}

#[test]
fn blank_system_prompt_is_omitted() {
    let messages = vec![Message::user("hi")];
    let built = build_chat_completions_messages("   ", &messages);
    assert_eq!(built.len(), 1);
}

#[test]
fn request_serializes_in_wire_shape() {
    let messages = vec![Message::user("hi")];
    let msgs = build_chat_completions_messages("sys", &messages);
    let body = CcRequest { model: "m", max_tokens: 64, messages: &msgs };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["model"], "m");
    assert_eq!(value["max_tokens"], 64);
    assert_eq!(value["messages"][0]["role"], "system");
    assert_eq!(value["messages"][1]["content"], "hi");
}
