#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use ai_chat_core::TokenUsage;
use ai_chat_llm::{
    ChatCompletionRequest, LLMError, LLMProvider, LLMStream, StreamChoice, StreamChunk,
    StreamDelta, StreamFunctionCall, StreamToolCall,
};
use async_trait::async_trait;
use futures::stream;

/// What the provider does for one request.
pub enum Round {
    Chunks(Vec<std::result::Result<StreamChunk, LLMError>>),
    Fail(LLMError),
}

/// Provider double that replays scripted rounds and records every request it receives.
///
/// Once the script runs out it answers every further request with `fallback`, or with a
/// plain "ok" reply when no fallback is set.
#[derive(Default)]
pub struct ScriptedProvider {
    rounds: Mutex<VecDeque<Round>>,
    fallback: Option<Vec<StreamChunk>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            ..Default::default()
        }
    }

    /// Answer every request with the same tool call.
    pub fn always_tool_call() -> Self {
        Self {
            fallback: Some(vec![tool_call_chunk(0, Some("loop"), Some("spin"), "{}")]),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_stream(&self, request: &ChatCompletionRequest) -> ai_chat_llm::Result<LLMStream> {
        self.requests.lock().unwrap().push(request.clone());

        let round = self.rounds.lock().unwrap().pop_front();
        let items = match round {
            Some(Round::Fail(error)) => return Err(error),
            Some(Round::Chunks(items)) => items,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| vec![content_chunk("ok")])
                .into_iter()
                .map(Ok)
                .collect(),
        };

        Ok(Box::pin(stream::iter(items)))
    }
}

pub fn ok_round(chunks: Vec<StreamChunk>) -> Round {
    Round::Chunks(chunks.into_iter().map(Ok).collect())
}

pub fn content_chunk(text: &str) -> StreamChunk {
    StreamChunk {
        choices: vec![StreamChoice {
            index: 0,
            delta: StreamDelta {
                content: Some(text.to_string()),
                ..Default::default()
            },
            finish_reason: None,
        }],
        ..Default::default()
    }
}

pub fn finish_chunk(reason: &str, model: &str, usage: Option<TokenUsage>) -> StreamChunk {
    StreamChunk {
        choices: vec![StreamChoice {
            index: 0,
            delta: StreamDelta::default(),
            finish_reason: Some(reason.to_string()),
        }],
        model: Some(model.to_string()),
        usage,
        ..Default::default()
    }
}

pub fn tool_call_chunk(
    index: u32,
    id: Option<&str>,
    name: Option<&str>,
    arguments: &str,
) -> StreamChunk {
    StreamChunk {
        choices: vec![StreamChoice {
            index: 0,
            delta: StreamDelta {
                tool_calls: Some(vec![StreamToolCall {
                    index,
                    id: id.map(str::to_string),
                    tool_type: id.map(|_| "function".to_string()),
                    function: Some(StreamFunctionCall {
                        name: name.map(str::to_string),
                        arguments: Some(arguments.to_string()),
                    }),
                }]),
                ..Default::default()
            },
            finish_reason: None,
        }],
        ..Default::default()
    }
}

pub fn usage(prompt: u32, completion: u32) -> TokenUsage {
    TokenUsage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
    }
}
