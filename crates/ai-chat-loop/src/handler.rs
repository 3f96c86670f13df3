use std::future::Future;

use ai_chat_core::{ToolCall, ToolResult};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("No tool call handlers registered")]
    NoHandler,

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Tool handler panicked: {0}")]
    Panicked(String),

    /// Failure the handler put in its own result; the text is kept as is.
    #[error("{0}")]
    Reported(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Runs tool calls requested by the model.
#[async_trait]
pub trait ToolCallHandler: Send + Sync {
    async fn handle(&self, call: ToolCall) -> Result<ToolResult>;
}

#[async_trait]
impl<F, Fut> ToolCallHandler for F
where
    F: Fn(ToolCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    async fn handle(&self, call: ToolCall) -> Result<ToolResult> {
        (self)(call).await
    }
}
