use std::collections::HashMap;

use ai_chat_core::{FunctionCall, ToolCall};
use uuid::Uuid;

use crate::protocol::openai::StreamToolCall;

/// Folds streamed tool call fragments into complete [`ToolCall`]s.
///
/// Providers split a call across deltas: the first fragment for an `index` carries the id,
/// type and function name, later fragments only append argument text.
#[derive(Debug, Default, Clone)]
pub struct StreamToolAccumulator {
    calls: HashMap<u32, PartialToolCall>,
}

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<String>,
    tool_type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl StreamToolAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragments: &[StreamToolCall]) {
        for fragment in fragments {
            let entry = self.calls.entry(fragment.index).or_default();

            if let Some(id) = fragment.id.as_ref().filter(|id| !id.is_empty()) {
                entry.id = Some(id.clone());
            }
            if let Some(tool_type) = fragment.tool_type.as_ref().filter(|t| !t.is_empty()) {
                entry.tool_type = Some(tool_type.clone());
            }
            if let Some(function) = &fragment.function {
                if let Some(name) = function.name.as_ref().filter(|n| !n.is_empty()) {
                    entry.name = Some(name.clone());
                }
                if let Some(arguments) = &function.arguments {
                    entry.arguments.push_str(arguments);
                }
            }
        }
    }

    /// Complete calls ordered by index. Fragments that never received a function name are
    /// dropped; a missing id is synthesised.
    pub fn finish(self) -> Vec<ToolCall> {
        let mut calls: Vec<_> = self.calls.into_iter().collect();
        calls.sort_by_key(|(index, _)| *index);

        calls
            .into_iter()
            .filter_map(|(index, partial)| {
                let Some(name) = partial.name else {
                    log::warn!("Dropping streamed tool call #{} without a function name", index);
                    return None;
                };
                Some(ToolCall {
                    id: partial
                        .id
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                    tool_type: partial.tool_type.unwrap_or_else(|| "function".to_string()),
                    function: FunctionCall {
                        name,
                        arguments: partial.arguments,
                    },
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}
