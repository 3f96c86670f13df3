//! Flat union-of-optionals chunk shape for consumers that predate [`ChunkEvent`].

use serde::{Deserialize, Serialize};

use crate::stream::chunk::{ChatStreamChunk, ChunkEvent, Phase};
use crate::types::{TokenUsage, ToolCall, ToolExecuting, ToolExecutionError, ToolResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_executing: Option<ToolExecuting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_error: Option<ToolExecutionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl From<&ChatStreamChunk> for WireChunk {
    fn from(chunk: &ChatStreamChunk) -> Self {
        let mut wire = WireChunk {
            usage: chunk.meta.usage.clone(),
            model: chunk.meta.model.clone(),
            finish_reason: chunk.meta.finish_reason.clone(),
            phase: chunk.meta.phase,
            ..Default::default()
        };

        match &chunk.event {
            ChunkEvent::Content { content } => wire.content = Some(content.clone()),
            ChunkEvent::ToolCallsDetected { tool_calls } => {
                wire.tool_calls = Some(tool_calls.clone())
            }
            ChunkEvent::ToolExecuting { tool } => wire.tool_executing = Some(tool.clone()),
            ChunkEvent::ToolResults { results } => wire.tool_results = Some(results.clone()),
            ChunkEvent::ToolError { error } => wire.tool_error = Some(error.clone()),
            ChunkEvent::Metadata => {}
            ChunkEvent::Done => wire.done = Some(true),
            ChunkEvent::Error { message, done } => {
                wire.error = Some(message.clone());
                if *done {
                    wire.done = Some(true);
                }
            }
        }

        wire
    }
}

impl From<ChatStreamChunk> for WireChunk {
    fn from(chunk: ChatStreamChunk) -> Self {
        WireChunk::from(&chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::chunk::ChunkMeta;

    #[test]
    fn done_chunk_carries_completion_metadata() {
        let chunk = ChatStreamChunk::done().with_meta(ChunkMeta {
            model: Some("gpt-4o".into()),
            finish_reason: Some("stop".into()),
            usage: Some(TokenUsage {
                prompt_tokens: 3,
                completion_tokens: 1,
                total_tokens: 4,
            }),
            phase: None,
        });

        let json = serde_json::to_value(WireChunk::from(&chunk)).unwrap();
        assert_eq!(json["done"], true);
        assert_eq!(json["finishReason"], "stop");
        assert_eq!(json["usage"]["total_tokens"], 4);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn round_limit_error_is_also_done() {
        let chunk = ChatStreamChunk::new(ChunkEvent::Error {
            message: "Maximum tool call limit (10) reached".into(),
            done: true,
        });

        let wire = WireChunk::from(chunk);
        assert_eq!(wire.done, Some(true));
        assert!(wire.error.unwrap().contains("Maximum tool call limit"));
    }

    #[test]
    fn phase_only_chunk_is_minimal() {
        let json = serde_json::to_string(&WireChunk::from(ChatStreamChunk::phase(
            Phase::Thinking,
        )))
        .unwrap();
        assert_eq!(json, r#"{"phase":"thinking"}"#);
    }
}
