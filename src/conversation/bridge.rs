//! Conversion from stored history to model-API messages

use super::message::{StoredMessage, StoredToolCall};
use crate::llm::{ContentBlock, LlmMessage};

/// Convert stored history into model-API form.
///
/// Runs of consecutive `tool` entries collapse into one user message of
/// `tool_result` blocks. `ai` entries with neither text nor tool calls are
/// dropped, as are unrecognized entries.
pub fn to_model_form(history: &[StoredMessage]) -> Vec<LlmMessage> {
    let mut messages = Vec::new();
    let mut i = 0;

    while i < history.len() {
        match &history[i] {
            StoredMessage::Human { content } => {
                messages.push(LlmMessage::user(content.clone()));
                i += 1;
            }
            StoredMessage::Ai {
                content,
                tool_calls,
            } => {
                if let Some(message) = assistant_message(content, tool_calls) {
                    messages.push(message);
                }
                i += 1;
            }
            StoredMessage::Tool { .. } => {
                let mut results = Vec::new();
                while let Some(StoredMessage::Tool {
                    content,
                    tool_call_id,
                }) = history.get(i)
                {
                    results.push(ContentBlock::tool_result(
                        tool_call_id.clone(),
                        content.clone(),
                    ));
                    i += 1;
                }
                messages.push(LlmMessage::user_blocks(results));
            }
            StoredMessage::Other(_) => i += 1,
        }
    }

    messages
}

fn assistant_message(content: &str, tool_calls: &[StoredToolCall]) -> Option<LlmMessage> {
    if tool_calls.is_empty() {
        return (!content.is_empty()).then(|| LlmMessage::assistant(content));
    }

    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
    if !content.is_empty() {
        blocks.push(ContentBlock::text(content));
    }
    blocks.extend(
        tool_calls
            .iter()
            .map(|call| ContentBlock::tool_use(call.id.clone(), call.name.clone(), call.args.clone())),
    );
    Some(LlmMessage::assistant_blocks(blocks))
}
