//! OpenAI-compatible chat completion request and streaming delta types.
//!
//! Many providers accept this shape; field names follow the OpenAI wire format exactly.

use ai_chat_core::{Message, TokenUsage, ToolSchema};
use serde::{Deserialize, Serialize};

use crate::provider::{LLMError, Result};

/// Body of a streaming `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: StreamDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<StreamToolCall>>,
}

/// One fragment of a tool call. Only the first fragment for an index carries id and name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamToolCall {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<StreamFunctionCall>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl StreamChunk {
    /// First choice; providers stream a single choice unless `n > 1` was requested.
    pub fn first_choice(&self) -> Option<&StreamChoice> {
        self.choices.first()
    }

    pub fn content(&self) -> Option<&str> {
        self.first_choice()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    pub fn tool_calls(&self) -> &[StreamToolCall] {
        self.first_choice()
            .and_then(|choice| choice.delta.tool_calls.as_deref())
            .unwrap_or(&[])
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_choice()
            .and_then(|choice| choice.finish_reason.as_deref())
    }
}

/// Parse an SSE `data:` payload.
///
/// - blank or `"[DONE]"` -> `Ok(None)`
/// - invalid JSON -> error
/// - an `{"error": ...}` payload -> `LLMError::Api`
pub fn parse_sse_data(data: &str) -> Result<Option<StreamChunk>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(data)?;

    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(LLMError::Api(message));
    }

    let chunk: StreamChunk = serde_json::from_value(value)?;
    Ok(Some(chunk))
}
