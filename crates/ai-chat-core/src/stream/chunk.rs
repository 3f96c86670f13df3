use serde::{Deserialize, Serialize};

use crate::types::{TokenUsage, ToolCall, ToolExecuting, ToolExecutionError, ToolResult};

/// Coarse progress marker for UI consumers. Never used for control flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Thinking,
    CallingTools,
    ProcessingResults,
    Responding,
}

/// Metadata that may ride along with any chunk event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChunkMeta {
    pub fn is_empty(&self) -> bool {
        self.phase.is_none()
            && self.model.is_none()
            && self.usage.is_none()
            && self.finish_reason.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkEvent {
    Content {
        content: String,
    },
    ToolCallsDetected {
        tool_calls: Vec<ToolCall>,
    },
    ToolExecuting {
        tool: ToolExecuting,
    },
    ToolResults {
        results: Vec<ToolResult>,
    },
    ToolError {
        error: ToolExecutionError,
    },
    /// Carries only `meta` (phase change, model/usage/finish reason report).
    Metadata,
    Done,
    /// Terminal. `done` is set when the loop stopped on purpose (round limit) rather than
    /// on a failure.
    Error {
        message: String,
        done: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatStreamChunk {
    #[serde(flatten)]
    pub event: ChunkEvent,
    #[serde(default, skip_serializing_if = "ChunkMeta::is_empty")]
    pub meta: ChunkMeta,
}

impl ChatStreamChunk {
    pub fn new(event: ChunkEvent) -> Self {
        Self {
            event,
            meta: ChunkMeta::default(),
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self::new(ChunkEvent::Content {
            content: content.into(),
        })
    }

    pub fn phase(phase: Phase) -> Self {
        Self::new(ChunkEvent::Metadata).with_phase(phase)
    }

    pub fn done() -> Self {
        Self::new(ChunkEvent::Done)
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::new(ChunkEvent::ToolCallsDetected { tool_calls })
    }

    pub fn tool_executing(tool: ToolExecuting) -> Self {
        Self::new(ChunkEvent::ToolExecuting { tool })
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self::new(ChunkEvent::ToolResults { results })
    }

    pub fn tool_error(error: ToolExecutionError) -> Self {
        Self::new(ChunkEvent::ToolError { error })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ChunkEvent::Error {
            message: message.into(),
            done: false,
        })
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.meta.phase = Some(phase);
        self
    }

    pub fn with_meta(mut self, meta: ChunkMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.event, ChunkEvent::Done | ChunkEvent::Error { .. })
    }

    pub fn is_done(&self) -> bool {
        match &self.event {
            ChunkEvent::Done => true,
            ChunkEvent::Error { done, .. } => *done,
            _ => false,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.event {
            ChunkEvent::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn content_text(&self) -> Option<&str> {
        match &self.event {
            ChunkEvent::Content { content } => Some(content),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_detection() {
        assert!(ChatStreamChunk::done().is_terminal());
        assert!(ChatStreamChunk::error("x").is_terminal());
        assert!(!ChatStreamChunk::content("x").is_terminal());
        assert!(!ChatStreamChunk::phase(Phase::Thinking).is_terminal());
    }

    #[test]
    fn plain_errors_are_not_done() {
        let chunk = ChatStreamChunk::error("boom");
        assert!(!chunk.is_done());
        assert_eq!(chunk.error_message(), Some("boom"));
    }

    #[test]
    fn content_can_carry_metadata() {
        let chunk = ChatStreamChunk::content("Hi").with_meta(ChunkMeta {
            model: Some("gpt-4o".to_string()),
            finish_reason: Some("stop".to_string()),
            ..Default::default()
        });

        assert_eq!(chunk.content_text(), Some("Hi"));
        assert_eq!(chunk.meta.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ChatStreamChunk::phase(Phase::CallingTools)).unwrap();
        assert_eq!(json["type"], "metadata");
        assert_eq!(json["meta"]["phase"], "calling_tools");
    }
}
