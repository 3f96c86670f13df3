pub mod message;
pub mod tool;

use serde::{Deserialize, Serialize};

pub use message::{Message, Role};
pub use tool::{
    FunctionCall, FunctionSchema, ToolCall, ToolExecuting, ToolExecutionError, ToolResult,
    ToolSchema,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Aggregated result of a fully drained chat stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: String,
}
