//! Property-based tests for the history bridge
//!
//! Histories are generated as well-formed exchanges: a human message,
//! optionally an ai turn with tool calls answered by tool messages, and an
//! optional final ai answer. Checked invariants:
//! - Every tool_result follows a tool_use with the same id
//! - Bridging is deterministic
//! - Each run of tool messages becomes exactly one user message
//! - ai turns keep their text and tool calls in order

use super::bridge::to_model_form;
use super::message::{StoredMessage, StoredToolCall};
use crate::llm::{ContentBlock, LlmMessage, MessageContent, MessageRole};
use proptest::prelude::*;
use serde_json::Value;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

fn arb_args() -> impl Strategy<Value = Value> {
    proptest::collection::btree_map("[a-z_]{1,8}", -100i64..100, 0..4).prop_map(|m| {
        Value::Object(
            m.into_iter()
                .map(|(k, v)| (k, Value::Number(v.into())))
                .collect(),
        )
    })
}

/// One exchange without ids: (human text, ai text, tool calls, final answer)
type Exchange = (String, String, Vec<(String, Value, String)>, Option<String>);

fn arb_exchange() -> impl Strategy<Value = Exchange> {
    (
        "[a-zA-Z0-9 ?]{1,40}",
        "[a-zA-Z0-9 .]{0,40}",
        proptest::collection::vec(("[a-z_]{3,12}", arb_args(), "[a-z0-9{}:\" ]{0,30}"), 0..4),
        proptest::option::of("[a-zA-Z0-9 .]{1,40}"),
    )
}

fn build_history(exchanges: Vec<Exchange>) -> Vec<StoredMessage> {
    let mut history = Vec::new();
    let mut next_id = 0usize;
    for (human, ai_text, calls, answer) in exchanges {
        history.push(StoredMessage::human(human));
        if calls.is_empty() {
            history.push(StoredMessage::ai(ai_text));
        } else {
            let mut tool_calls = Vec::new();
            let mut results = Vec::new();
            for (name, args, output) in calls {
                let id = format!("toolu_{next_id}");
                next_id += 1;
                results.push(StoredMessage::tool(id.clone(), output));
                tool_calls.push(StoredToolCall { id, name, args });
            }
            history.push(StoredMessage::Ai {
                content: ai_text,
                tool_calls,
            });
            history.extend(results);
        }
        if let Some(answer) = answer {
            history.push(StoredMessage::ai(answer));
        }
    }
    history
}

fn arb_history() -> impl Strategy<Value = Vec<StoredMessage>> {
    proptest::collection::vec(arb_exchange(), 0..6).prop_map(build_history)
}

fn is_tool_result_message(message: &LlmMessage) -> bool {
    message.role == MessageRole::User
        && matches!(&message.content, MessageContent::Blocks(blocks)
            if blocks.iter().all(|b| matches!(b, ContentBlock::ToolResult { .. })))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn tool_results_follow_their_tool_use(history in arb_history()) {
        let mut seen = HashSet::new();
        for message in to_model_form(&history) {
            for block in message.blocks() {
                match block {
                    ContentBlock::ToolUse { id, .. } => {
                        seen.insert(id);
                    }
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        prop_assert!(seen.contains(&tool_use_id), "orphan result {}", tool_use_id);
                    }
                    ContentBlock::Text { .. } => {}
                }
            }
        }
    }

    #[test]
    fn bridging_is_deterministic(history in arb_history()) {
        prop_assert_eq!(to_model_form(&history), to_model_form(&history));
    }

    #[test]
    fn tool_runs_collapse_to_one_message(history in arb_history()) {
        let runs = history
            .iter()
            .zip(history.iter().skip(1).map(Some).chain(std::iter::once(None)))
            .filter(|(current, next)| {
                matches!(current, StoredMessage::Tool { .. })
                    && !matches!(next, Some(StoredMessage::Tool { .. }))
            })
            .count();
        let messages = to_model_form(&history);
        let grouped = messages.iter().filter(|m| is_tool_result_message(m)).count();
        prop_assert_eq!(grouped, runs);

        let stored_results = history
            .iter()
            .filter(|m| matches!(m, StoredMessage::Tool { .. }))
            .count();
        let bridged_results: usize = messages
            .iter()
            .filter(|m| is_tool_result_message(m))
            .map(|m| m.blocks().len())
            .sum();
        prop_assert_eq!(bridged_results, stored_results);
    }

    #[test]
    fn ai_turns_preserve_text_and_calls(history in arb_history()) {
        let expected: Vec<Vec<ContentBlock>> = history
            .iter()
            .filter_map(|m| match m {
                StoredMessage::Ai { content, tool_calls } => {
                    let mut blocks = Vec::new();
                    if !content.is_empty() {
                        blocks.push(ContentBlock::text(content.clone()));
                    }
                    for call in tool_calls {
                        blocks.push(ContentBlock::tool_use(
                            call.id.clone(),
                            call.name.clone(),
                            call.args.clone(),
                        ));
                    }
                    (!blocks.is_empty()).then_some(blocks)
                }
                _ => None,
            })
            .collect();
        let actual: Vec<Vec<ContentBlock>> = to_model_form(&history)
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(LlmMessage::blocks)
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn human_messages_map_one_to_one(history in arb_history()) {
        let humans: Vec<String> = history
            .iter()
            .filter_map(|m| match m {
                StoredMessage::Human { content } => Some(content.clone()),
                _ => None,
            })
            .collect();
        let users: Vec<String> = to_model_form(&history)
            .into_iter()
            .filter_map(|m| match m.content {
                MessageContent::Text(text) if m.role == MessageRole::User => Some(text),
                _ => None,
            })
            .collect();
        prop_assert_eq!(users, humans);
    }
}
