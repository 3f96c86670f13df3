pub mod accumulator;
pub mod openai;
pub mod protocol;
pub mod provider;
pub mod sse;

pub use accumulator::StreamToolAccumulator;
pub use openai::OpenAICompatProvider;
pub use protocol::openai::{
    ChatCompletionRequest, StreamChoice, StreamChunk, StreamDelta, StreamFunctionCall,
    StreamToolCall,
};
pub use provider::{LLMError, LLMProvider, LLMStream, Result};
