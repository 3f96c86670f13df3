use std::fmt;
use std::sync::Arc;

use ai_chat_core::ToolSchema;

use crate::handler::ToolCallHandler;

/// Per-call overrides for [`ChatOrchestrator::send_message`](crate::ChatOrchestrator::send_message).
#[derive(Clone, Default)]
pub struct SendOptions {
    /// Replaces any system message in the history, every round.
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
    pub tools: Vec<ToolSchema>,
    /// Handler for tool calls requested during this call only.
    pub on_tool_call: Option<Arc<dyn ToolCallHandler>>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_handler(mut self, handler: Arc<dyn ToolCallHandler>) -> Self {
        self.on_tool_call = Some(handler);
        self
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("system_prompt", &self.system_prompt)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .field("on_tool_call", &self.on_tool_call.is_some())
            .finish()
    }
}
