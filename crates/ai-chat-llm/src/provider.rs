use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::protocol::openai::{ChatCompletionRequest, StreamChunk};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Raw provider deltas, in arrival order.
pub type LLMStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// A chat completion endpoint that answers with a stream of deltas.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Issue one streaming completion request.
    ///
    /// Errors returned here happen before any delta arrives; failures after that
    /// surface as `Err` items on the stream.
    async fn chat_stream(&self, request: &ChatCompletionRequest) -> Result<LLMStream>;
}
