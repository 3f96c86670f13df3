pub mod config;
pub mod error;
pub mod stream;
pub mod types;

pub use config::{ChatConfig, DEFAULT_TIMEOUT_MS};
pub use error::{ChatError, Result};
pub use stream::{error_chunk, ChatStreamChunk, ChunkEvent, ChunkMeta, Phase, WireChunk};
pub use types::{
    ChatResponse, FunctionCall, FunctionSchema, Message, Role, TokenUsage, ToolCall,
    ToolExecuting, ToolExecutionError, ToolResult, ToolSchema,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
