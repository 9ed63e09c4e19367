//! Materialises a streamed model response into a complete message

use super::types::{BlockStart, ContentBlock, LlmResponse, LlmStreamEvent, Usage};
use super::LlmError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Block under construction, keyed by its stream index
#[derive(Debug)]
enum PartialBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        json: String,
    },
}

/// Accumulates stream events until the message completes.
///
/// Tool input arrives as partial JSON fragments; they are concatenated per
/// block and parsed once, when the message is finished.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    blocks: BTreeMap<usize, PartialBlock>,
    stop_reason: Option<String>,
    usage: Usage,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one stream event
    pub fn observe(&mut self, event: &LlmStreamEvent) {
        match event {
            LlmStreamEvent::MessageStart { usage } => {
                self.usage.input_tokens = usage.input_tokens;
                self.usage.output_tokens = usage.output_tokens;
            }
            LlmStreamEvent::BlockStart { index, block } => {
                let partial = match block {
                    BlockStart::Text => PartialBlock::Text(String::new()),
                    BlockStart::ToolUse { id, name } => PartialBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        json: String::new(),
                    },
                };
                self.blocks.insert(*index, partial);
            }
            LlmStreamEvent::TextDelta { index, text } => {
                match self
                    .blocks
                    .entry(*index)
                    .or_insert_with(|| PartialBlock::Text(String::new()))
                {
                    PartialBlock::Text(buf) => buf.push_str(text),
                    PartialBlock::ToolUse { id, .. } => {
                        tracing::warn!(index, tool_id = %id, "Text delta for tool_use block ignored");
                    }
                }
            }
            LlmStreamEvent::InputJsonDelta {
                index,
                partial_json,
            } => match self.blocks.get_mut(index) {
                Some(PartialBlock::ToolUse { json, .. }) => json.push_str(partial_json),
                _ => {
                    tracing::warn!(index, "Input JSON delta without a tool_use block");
                }
            },
            LlmStreamEvent::MessageDelta {
                stop_reason,
                output_tokens,
            } => {
                if stop_reason.is_some() {
                    self.stop_reason.clone_from(stop_reason);
                }
                if let Some(tokens) = output_tokens {
                    self.usage.output_tokens = *tokens;
                }
            }
            LlmStreamEvent::BlockStop { .. } | LlmStreamEvent::Completed(_) => {}
        }
    }

    /// Build the final message, parsing accumulated tool input
    pub fn finish(self) -> Result<LlmResponse, LlmError> {
        let mut content = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.into_values() {
            match block {
                PartialBlock::Text(text) => content.push(ContentBlock::Text { text }),
                PartialBlock::ToolUse { id, name, json } => {
                    let input = parse_tool_input(&name, &json)?;
                    content.push(ContentBlock::ToolUse { id, name, input });
                }
            }
        }

        Ok(LlmResponse {
            content,
            stop_reason: self.stop_reason,
            usage: self.usage,
        })
    }
}

fn parse_tool_input(name: &str, json: &str) -> Result<Value, LlmError> {
    if json.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(json)
        .map_err(|e| LlmError::unknown(format!("Invalid input JSON for tool {name}: {e}")))
}
