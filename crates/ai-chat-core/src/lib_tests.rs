use super::*;

#[test]
fn test_complete_response_message_round_trips_as_input() {
    let response = ChatResponse {
        message: Message::assistant("Hello", None),
        usage: TokenUsage::default(),
        model: "gpt-4o".to_string(),
        finish_reason: "stop".to_string(),
    };

    let encoded = serde_json::to_string(&vec![response.message.clone()]).unwrap();
    let decoded: Vec<Message> = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, vec![response.message]);
}

#[test]
fn test_chat_response_uses_camel_case() {
    let response = ChatResponse {
        message: Message::assistant("", None),
        usage: TokenUsage::default(),
        model: "m".to_string(),
        finish_reason: "stop".to_string(),
    };

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["finishReason"], "stop");
}

#[test]
fn test_tool_execution_error_shape() {
    let error = ToolExecutionError {
        tool_call_id: "c1".to_string(),
        tool_name: "lookup".to_string(),
        error: "boom".to_string(),
        details: serde_json::json!({"arguments": "{bad"}),
    };

    let wire = WireChunk::from(ChatStreamChunk::tool_error(error).with_phase(Phase::ProcessingResults));
    let json = serde_json::to_value(&wire).unwrap();
    assert_eq!(json["toolError"]["tool_name"], "lookup");
    assert_eq!(json["phase"], "processing_results");
}
