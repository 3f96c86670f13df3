//! Tool call execution and bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ai_chat_core::{
    ChatStreamChunk, Phase, ToolCall, ToolExecuting, ToolExecutionError, ToolResult,
};
use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};

use crate::handler::{Result, ToolCallHandler, ToolError};

/// Receives per-call progress chunks while a batch runs.
pub type ChunkSink = dyn Fn(ChatStreamChunk) + Send + Sync;

/// Ledger of tool calls keyed by call id.
///
/// A call moves from `executing` to exactly one of `completed` or `failed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolExecutionState {
    pub executing: HashMap<String, ToolExecuting>,
    pub completed: HashMap<String, ToolResult>,
    pub failed: HashMap<String, ToolExecutionError>,
}

/// Executes model-requested tool calls through registered handlers.
///
/// Only the first registered handler is ever invoked; additional handlers are kept but
/// not consulted.
#[derive(Default)]
pub struct ToolExecutionManager {
    handlers: RwLock<Vec<Arc<dyn ToolCallHandler>>>,
    state: Mutex<ToolExecutionState>,
}

impl ToolExecutionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: Arc<dyn ToolCallHandler>) -> Self {
        let manager = Self::new();
        manager.add_handler(handler);
        manager
    }

    pub fn add_handler(&self, handler: Arc<dyn ToolCallHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if !handlers.is_empty() {
            log::debug!(
                "Registering tool handler #{}; only the first handler is invoked",
                handlers.len() + 1
            );
        }
        handlers.push(handler);
    }

    pub fn clear_handlers(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn has_handlers(&self) -> bool {
        !self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn first_handler(&self) -> Option<Arc<dyn ToolCallHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .cloned()
    }

    fn state(&self) -> MutexGuard<'_, ToolExecutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one call through the first handler.
    ///
    /// The handler runs on its own task, so dropping the returned future does not cancel
    /// work the handler already started.
    pub async fn execute_tool_call(&self, call: &ToolCall) -> Result<ToolResult> {
        let handler = self.first_handler().ok_or(ToolError::NoHandler)?;

        let owned = call.clone();
        let mut result = tokio::spawn(async move { handler.handle(owned).await })
            .await
            .map_err(|e| ToolError::Panicked(e.to_string()))??;

        if result.tool_call_id != call.id {
            log::warn!(
                "Tool handler answered call {} with id {:?}; correcting",
                call.id,
                result.tool_call_id
            );
            result.tool_call_id = call.id.clone();
        }

        Ok(result)
    }

    /// Run a batch of calls concurrently.
    ///
    /// The returned results line up with `calls` by position. A failing call yields a result
    /// carrying `error` and never affects its siblings.
    pub async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        sink: Option<&ChunkSink>,
    ) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.run_tracked(call, sink))).await
    }

    async fn run_tracked(&self, call: &ToolCall, sink: Option<&ChunkSink>) -> ToolResult {
        let emit = |chunk: ChatStreamChunk| {
            if let Some(sink) = sink {
                sink(chunk);
            }
        };

        let arguments = match call.parse_arguments() {
            Ok(arguments) => arguments,
            Err(e) => {
                let error = ToolError::InvalidArguments(e.to_string());
                log::warn!("Tool call {} ({}) has malformed arguments: {}", call.id, call.name(), e);
                let failure = self.record_failure(
                    call,
                    &error,
                    json!({ "arguments": call.function.arguments }),
                );
                emit(ChatStreamChunk::tool_error(failure).with_phase(Phase::ProcessingResults));
                return ToolResult::failure(call.id.clone(), error.to_string());
            }
        };

        let executing = ToolExecuting {
            id: call.id.clone(),
            name: call.name().to_string(),
            arguments: arguments.clone(),
            start_time: Utc::now(),
        };
        self.state().executing.insert(call.id.clone(), executing.clone());
        emit(ChatStreamChunk::tool_executing(executing).with_phase(Phase::CallingTools));

        log::debug!("Executing tool call {} ({})", call.id, call.name());

        let outcome = match self.execute_tool_call(call).await {
            Ok(result) => match result.error.clone() {
                Some(message) => Err(ToolError::Reported(message)),
                None => Ok(result),
            },
            Err(error) => Err(error),
        };

        match outcome {
            Ok(result) => {
                {
                    let mut state = self.state();
                    state.executing.remove(&call.id);
                    state.completed.insert(call.id.clone(), result.clone());
                }
                emit(
                    ChatStreamChunk::tool_results(vec![result.clone()])
                        .with_phase(Phase::ProcessingResults),
                );
                result
            }
            Err(error) => {
                log::warn!("Tool call {} ({}) failed: {}", call.id, call.name(), error);
                let failure = self.record_failure(call, &error, json!({ "arguments": arguments }));
                emit(ChatStreamChunk::tool_error(failure).with_phase(Phase::ProcessingResults));
                ToolResult::failure(call.id.clone(), error.to_string())
            }
        }
    }

    fn record_failure(&self, call: &ToolCall, error: &ToolError, details: Value) -> ToolExecutionError {
        let failure = ToolExecutionError {
            tool_call_id: call.id.clone(),
            tool_name: call.name().to_string(),
            error: error.to_string(),
            details,
        };

        let mut state = self.state();
        state.executing.remove(&call.id);
        state.failed.insert(call.id.clone(), failure.clone());
        failure
    }

    /// Snapshot of the ledger; later mutations of either side are independent.
    pub fn execution_state(&self) -> ToolExecutionState {
        self.state().clone()
    }

    pub fn clear_state(&self) {
        *self.state() = ToolExecutionState::default();
    }

    pub fn has_executing_tools(&self) -> bool {
        !self.state().executing.is_empty()
    }

    pub fn all_results(&self) -> Vec<ToolResult> {
        self.state().completed.values().cloned().collect()
    }

    pub fn all_errors(&self) -> Vec<ToolExecutionError> {
        self.state().failed.values().cloned().collect()
    }
}
