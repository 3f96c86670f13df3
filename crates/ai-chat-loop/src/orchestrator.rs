use std::pin::Pin;
use std::sync::Arc;

use ai_chat_core::{
    error_chunk, ChatConfig, ChatError, ChatResponse, ChatStreamChunk, ChunkEvent, Message, Phase,
    Result, ToolCall, ToolResult,
};
use ai_chat_llm::{ChatCompletionRequest, LLMProvider, OpenAICompatProvider};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::manager::{ChunkSink, ToolExecutionManager};
use crate::options::SendOptions;
use crate::transform::ChunkTransformer;

/// Upper bound on tool-calling rounds per `send_message` call.
pub const MAX_TOOL_ROUNDS: usize = 10;

const EMPTY_MESSAGES: &str = "Messages array is required and cannot be empty";

pub type ChatStream = Pin<Box<dyn Stream<Item = ChatStreamChunk> + Send>>;

/// Drives one conversation turn against a completion endpoint, including the
/// tool-calling round trips.
///
/// The orchestrator holds only read-only configuration and the provider handle; every
/// [`send_message`](Self::send_message) call owns its own history and tool handler, so
/// concurrent calls on one instance do not interfere.
pub struct ChatOrchestrator {
    config: ChatConfig,
    llm: Arc<dyn LLMProvider>,
}

impl ChatOrchestrator {
    pub fn new(config: ChatConfig, llm: Arc<dyn LLMProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, llm })
    }

    /// Build an orchestrator talking to `config.base_url` over HTTP.
    pub fn from_config(config: ChatConfig) -> Result<Self> {
        config.validate()?;
        let llm = Arc::new(OpenAICompatProvider::from_config(&config));
        Ok(Self { config, llm })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Stream one turn.
    ///
    /// Never fails outright: every failure is reported as a final chunk carrying an error.
    /// Tool calls are announced as soon as the provider finishes them with a `tool_calls`
    /// finish reason, or once the round's stream ends when it never sends one.
    /// Dropping the stream stops the turn; tool handlers already running are left to finish.
    pub fn send_message(&self, messages: Vec<Message>, options: SendOptions) -> ChatStream {
        Box::pin(run_turn(
            Arc::clone(&self.llm),
            self.config.clone(),
            messages,
            options,
        ))
    }

    /// Drain [`send_message`](Self::send_message) into a single response.
    pub async fn send_message_complete(
        &self,
        messages: Vec<Message>,
        options: SendOptions,
    ) -> Result<ChatResponse> {
        let fallback_model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let mut stream = self.send_message(messages, options);
        let mut content = String::new();
        let mut usage = None;
        let mut model = None;
        let mut finish_reason = None;

        while let Some(chunk) = stream.next().await {
            if let Some(message) = chunk.error_message() {
                return Err(ChatError::Stream(message.to_string()));
            }
            if let Some(text) = chunk.content_text() {
                content.push_str(text);
            }
            if chunk.meta.usage.is_some() {
                usage = chunk.meta.usage.clone();
            }
            if let Some(name) = chunk.meta.model.as_ref().filter(|m| !m.is_empty()) {
                model = Some(name.clone());
            }
            if let Some(reason) = chunk.meta.finish_reason.as_ref().filter(|r| !r.is_empty()) {
                finish_reason = Some(reason.clone());
            }
        }

        Ok(ChatResponse {
            message: Message::assistant(content, None),
            usage: usage.unwrap_or_default(),
            model: model.unwrap_or(fallback_model),
            finish_reason: finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }
}

enum BatchEvent {
    Chunk(ChatStreamChunk),
    Finished(Vec<ToolResult>),
}

fn run_turn(
    llm: Arc<dyn LLMProvider>,
    config: ChatConfig,
    messages: Vec<Message>,
    options: SendOptions,
) -> impl Stream<Item = ChatStreamChunk> + Send {
    async_stream::stream! {
        let request_id = Uuid::new_v4().to_string();

        if messages.is_empty() {
            log::warn!("[{}] Rejecting turn with no messages", request_id);
            yield error_chunk(&ChatError::InvalidInput(EMPTY_MESSAGES.to_string()));
            return;
        }

        let manager = Arc::new(match options.on_tool_call.as_ref() {
            Some(handler) => ToolExecutionManager::with_handler(Arc::clone(handler)),
            None => ToolExecutionManager::new(),
        });
        let model = options.model.clone().unwrap_or_else(|| config.model.clone());
        let temperature = options.temperature.or(config.temperature);
        let max_tokens = options.max_tokens.or(config.max_tokens);

        let mut history = messages;
        let mut tool_rounds = 0usize;

        log::debug!(
            "[{}] Starting turn: model={}, messages={}, tools={}",
            request_id,
            model,
            history.len(),
            options.tools.len()
        );

        while tool_rounds < MAX_TOOL_ROUNDS {
            if let Some(prompt) = options.system_prompt.as_deref() {
                apply_system_prompt(&mut history, prompt);
            }

            yield ChatStreamChunk::phase(Phase::Thinking);

            let request = ChatCompletionRequest::new(model.clone(), history.clone())
                .with_temperature(temperature)
                .with_max_tokens(max_tokens)
                .with_tools(options.tools.clone());

            log::debug!(
                "[{}] Round {}: sending {} messages",
                request_id,
                tool_rounds + 1,
                request.messages.len()
            );

            let timer = Timer::new("llm_request");
            let mut stream = match llm.chat_stream(&request).await {
                Ok(stream) => stream,
                Err(e) => {
                    log::error!("[{}] Completion request failed: {}", request_id, e);
                    yield error_chunk(&e);
                    return;
                }
            };

            let mut transformer = ChunkTransformer::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(raw) => {
                        if let Some(chunk) = transformer.transform(raw) {
                            yield chunk;
                        }
                        if let Some(calls) = transformer.take_detected() {
                            yield ChatStreamChunk::tool_calls(calls).with_phase(Phase::CallingTools);
                        }
                    }
                    Err(e) => {
                        log::error!("[{}] Stream failed: {}", request_id, e);
                        yield error_chunk(&e);
                        return;
                    }
                }
            }
            timer.debug(&request_id);

            let announced = transformer.announced();
            let (tool_calls, completion) = transformer.finish();

            if tool_calls.is_empty() {
                log::debug!("[{}] Turn complete after {} tool rounds", request_id, tool_rounds);
                yield ChatStreamChunk::phase(Phase::Responding);
                yield ChatStreamChunk::done().with_meta(completion);
                return;
            }

            tool_rounds += 1;
            log::info!(
                "[{}] Round {} requested {} tool call(s)",
                request_id,
                tool_rounds,
                tool_calls.len()
            );
            if !manager.has_handlers() {
                log::warn!("[{}] Tool calls requested but no handler is registered", request_id);
            }

            if !announced {
                yield ChatStreamChunk::tool_calls(tool_calls.clone()).with_phase(Phase::CallingTools);
            }
            history.push(Message::assistant("", Some(tool_calls.clone())));

            let (tx, mut rx) = mpsc::unbounded_channel();
            let batch_manager = Arc::clone(&manager);
            let batch_calls = tool_calls.clone();
            let mut batch = Box::pin(async move {
                let forward = move |chunk: ChatStreamChunk| {
                    let _ = tx.send(chunk);
                };
                let sink: &ChunkSink = &forward;
                batch_manager.execute_tool_calls(&batch_calls, Some(sink)).await
            });

            let results = loop {
                let event = tokio::select! {
                    biased;
                    Some(chunk) = rx.recv() => BatchEvent::Chunk(chunk),
                    results = &mut batch => BatchEvent::Finished(results),
                };
                match event {
                    BatchEvent::Chunk(chunk) => yield chunk,
                    BatchEvent::Finished(results) => break results,
                }
            };
            while let Ok(chunk) = rx.try_recv() {
                yield chunk;
            }

            append_tool_results(&mut history, &tool_calls, &results);
            yield ChatStreamChunk::tool_results(results).with_phase(Phase::ProcessingResults);
        }

        log::warn!(
            "[{}] Tool call limit reached after {} rounds",
            request_id,
            MAX_TOOL_ROUNDS
        );
        yield ChatStreamChunk::new(ChunkEvent::Error {
            message: format!("Maximum tool call limit ({}) reached", MAX_TOOL_ROUNDS),
            done: true,
        });
    }
}

/// Put `prompt` first, dropping any system messages already present.
fn apply_system_prompt(history: &mut Vec<Message>, prompt: &str) {
    history.retain(|message| !message.is_system());
    history.insert(0, Message::system(prompt));
}

fn append_tool_results(history: &mut Vec<Message>, calls: &[ToolCall], results: &[ToolResult]) {
    for (call, result) in calls.iter().zip(results) {
        history.push(Message::tool_result(
            result.tool_call_id.clone(),
            call.name(),
            result.to_message_content(),
        ));
    }
}

struct Timer {
    name: String,
    start: std::time::Instant,
}

impl Timer {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    fn debug(&self, request_id: &str) {
        log::debug!(
            "[{}] {} completed in {}ms",
            request_id,
            self.name,
            self.elapsed_ms()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_chat_core::Role;

    #[test]
    fn system_prompt_replaces_existing_system_messages() {
        let mut history = vec![
            Message::system("old"),
            Message::user("hi"),
            Message::system("stray"),
        ];

        apply_system_prompt(&mut history, "new");
        apply_system_prompt(&mut history, "new");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[0].content, "new");
        assert_eq!(history[1].role, Role::User);
    }

    #[test]
    fn tool_results_become_tool_messages() {
        let calls = vec![
            ToolCall::new("c1", "lookup", "{}"),
            ToolCall::new("c2", "search", "{bad"),
        ];
        let results = vec![
            ToolResult::success("c1", "42"),
            ToolResult::failure("c2", "Invalid arguments: eof"),
        ];
        let mut history = Vec::new();

        append_tool_results(&mut history, &calls, &results);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Tool);
        assert_eq!(history[0].content, "42");
        assert_eq!(history[0].name.as_deref(), Some("lookup"));
        assert_eq!(history[1].tool_call_id.as_deref(), Some("c2"));
        let content: serde_json::Value = serde_json::from_str(&history[1].content).unwrap();
        assert!(content.get("error").is_some());
    }

    #[test]
    fn construction_rejects_missing_model() {
        let error = ChatOrchestrator::from_config(ChatConfig::new("http://localhost", ""))
            .err()
            .expect("missing model must fail");
        assert_eq!(error.code(), "INVALID_CONFIG");
    }

    #[test]
    fn construction_rejects_missing_base_url() {
        let error = ChatOrchestrator::from_config(ChatConfig::new("", "gpt-4o"))
            .err()
            .expect("missing base url must fail");
        assert_eq!(error.code(), "INVALID_CONFIG");
    }
}
