use ai_chat_core::{ChatStreamChunk, ChunkEvent, ChunkMeta, TokenUsage, ToolCall};
use ai_chat_llm::{StreamChunk, StreamToolAccumulator};

/// Turns one round's provider deltas into stream chunks.
///
/// Tool call fragments are folded into the accumulator instead of being forwarded; the last
/// reported model, usage and finish reason are remembered for the round's terminal chunk.
/// Calls are finalised as soon as the provider reports `finish_reason: "tool_calls"`.
#[derive(Debug, Default)]
pub struct ChunkTransformer {
    tool_calls: StreamToolAccumulator,
    detected: Option<Vec<ToolCall>>,
    announced: bool,
    model: Option<String>,
    usage: Option<TokenUsage>,
    finish_reason: Option<String>,
}

impl ChunkTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a chunk only when the delta carries something a consumer can see.
    pub fn transform(&mut self, chunk: StreamChunk) -> Option<ChatStreamChunk> {
        let meta = ChunkMeta {
            phase: None,
            model: chunk.model.clone(),
            usage: chunk.usage.clone(),
            finish_reason: chunk.finish_reason().map(str::to_string),
        };

        self.tool_calls.push(chunk.tool_calls());

        if meta.model.is_some() {
            self.model = meta.model.clone();
        }
        if meta.usage.is_some() {
            self.usage = meta.usage.clone();
        }
        if meta.finish_reason.is_some() {
            self.finish_reason = meta.finish_reason.clone();
        }
        if meta.finish_reason.as_deref() == Some("tool_calls")
            && self.detected.is_none()
            && !self.tool_calls.is_empty()
        {
            let calls = std::mem::take(&mut self.tool_calls).finish();
            if !calls.is_empty() {
                self.detected = Some(calls);
            }
        }

        let content = chunk.content().filter(|content| !content.is_empty());
        match content {
            Some(content) => Some(ChatStreamChunk::content(content).with_meta(meta)),
            None if !meta.is_empty() => Some(ChatStreamChunk::new(ChunkEvent::Metadata).with_meta(meta)),
            None => None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.detected.is_some() || !self.tool_calls.is_empty()
    }

    /// Calls finalised by a `tool_calls` finish reason, returned once.
    pub fn take_detected(&mut self) -> Option<Vec<ToolCall>> {
        if self.announced {
            return None;
        }
        let calls = self.detected.clone()?;
        self.announced = true;
        Some(calls)
    }

    /// Whether [`take_detected`](Self::take_detected) already handed the calls out.
    pub fn announced(&self) -> bool {
        self.announced
    }

    /// Last observed model, usage and finish reason of the round.
    pub fn completion_meta(&self) -> ChunkMeta {
        ChunkMeta {
            phase: None,
            model: self.model.clone(),
            usage: self.usage.clone(),
            finish_reason: self.finish_reason.clone(),
        }
    }

    pub fn finish(self) -> (Vec<ToolCall>, ChunkMeta) {
        let meta = self.completion_meta();
        let late = self.tool_calls.finish();
        let calls = match self.detected {
            Some(mut calls) => {
                if !late.is_empty() {
                    log::warn!("{} tool call(s) arrived after the tool_calls finish", late.len());
                    calls.extend(late);
                }
                calls
            }
            None => late,
        };
        (calls, meta)
    }
}
