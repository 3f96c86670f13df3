use std::fmt::Display;

use crate::stream::chunk::ChatStreamChunk;

/// Turn any displayable error into a terminal error chunk.
///
/// An empty message is replaced so the chunk always says something.
pub fn error_chunk<E: Display + ?Sized>(error: &E) -> ChatStreamChunk {
    let message = error.to_string();
    if message.trim().is_empty() {
        ChatStreamChunk::error("Unknown error")
    } else {
        ChatStreamChunk::error(message)
    }
}
