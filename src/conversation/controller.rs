//! Conversation controller
//!
//! Applies inbound commands to the conversation state, builds model input
//! from history plus the newly staged messages, runs the turn loop and
//! projects every engine event onto both the outbound stream and the state.

use super::bridge::to_model_form;
use super::command::Command;
use super::message::{ConversationState, StoredMessage, StoredToolCall};
use crate::llm::{ContentBlock, LlmMessage};
use crate::runtime::{AgentEvent, LlmClient, ToolExecutor, TurnLoop};
use crate::tools::{error_result, render_result};
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Event sent to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEvent {
    AppendText {
        text: String,
    },
    ToolCallStarted {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    ToolCallArgs {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        args: Value,
    },
    ToolResult {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        result: Value,
    },
    /// Final snapshot of the updated conversation state
    State {
        state: ConversationState,
    },
    /// The run failed; sent after the state snapshot
    Error {
        message: String,
    },
}

impl OutboundEvent {
    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppendText { .. } => "append-text",
            Self::ToolCallStarted { .. } => "tool-call-started",
            Self::ToolCallArgs { .. } => "tool-call-args",
            Self::ToolResult { .. } => "tool-result",
            Self::State { .. } => "state",
            Self::Error { .. } => "error",
        }
    }
}

/// Apply `commands` to `state` and build the model input for this request.
///
/// New human messages and tool results are appended to the state and also
/// staged in model form. History is the state without the staged entries,
/// so the latest input reaches the model exactly once.
pub fn prepare_turn(state: &mut ConversationState, commands: &[Command]) -> Vec<LlmMessage> {
    let mut staged = Vec::new();

    for command in commands {
        match command {
            Command::AddMessage { message } => {
                let Some(text) = message.text() else {
                    tracing::debug!("Skipping add-message without text parts");
                    continue;
                };
                state.messages.push(StoredMessage::human(text.clone()));
                staged.push(LlmMessage::user(text));
            }
            Command::AddToolResult {
                tool_call_id,
                result,
                ..
            } => {
                let content = render_result(result);
                state
                    .messages
                    .push(StoredMessage::tool(tool_call_id.clone(), content.clone()));
                staged.push(LlmMessage::user_blocks(vec![ContentBlock::tool_result(
                    tool_call_id.clone(),
                    content,
                )]));
            }
            Command::Unknown => tracing::debug!("Skipping unrecognized command"),
        }
    }

    let history_len = state.messages.len() - staged.len();
    let mut messages = to_model_form(&state.messages[..history_len]);
    messages.extend(staged);
    messages
}

/// Tracks the `ai` message receiving the current assistant turn
#[derive(Debug, Default)]
struct TurnProjection {
    open: Option<usize>,
}

impl TurnProjection {
    fn apply(&mut self, state: &mut ConversationState, event: AgentEvent) -> OutboundEvent {
        match event {
            AgentEvent::TextDelta { text } => {
                let index = self.open_turn(state);
                if let Some(StoredMessage::Ai { content, .. }) = state.messages.get_mut(index) {
                    content.push_str(&text);
                }
                OutboundEvent::AppendText { text }
            }
            AgentEvent::ToolCallStart { id, name } => {
                let index = self.open_turn(state);
                if let Some(StoredMessage::Ai { tool_calls, .. }) = state.messages.get_mut(index)
                {
                    tool_calls.push(StoredToolCall::pending(id.clone(), name.clone()));
                }
                OutboundEvent::ToolCallStarted {
                    tool_call_id: id,
                    tool_name: name,
                }
            }
            AgentEvent::ToolCallArgs { id, name, args } => {
                match self.open_call(state, &id) {
                    Some(call) => call.args.clone_from(&args),
                    None => tracing::warn!(tool_use_id = %id, "Arguments for a tool call that never started"),
                }
                OutboundEvent::ToolCallArgs {
                    tool_call_id: id,
                    tool_name: name,
                    args,
                }
            }
            AgentEvent::ToolResult { id, name, result } => {
                state
                    .messages
                    .push(StoredMessage::tool(id.clone(), render_result(&result)));
                self.open = None;
                OutboundEvent::ToolResult {
                    tool_call_id: id,
                    tool_name: name,
                    result,
                }
            }
        }
    }

    /// Answer every call on the open `ai` message that has no `tool` entry
    /// yet, so the stored history stays valid model input after a failure.
    fn interrupt(&mut self, state: &mut ConversationState) -> Vec<OutboundEvent> {
        let Some(index) = self.open.take() else {
            return Vec::new();
        };
        let Some(StoredMessage::Ai { tool_calls, .. }) = state.messages.get(index) else {
            return Vec::new();
        };

        let unanswered: Vec<(String, String)> = tool_calls
            .iter()
            .filter(|call| {
                !state.messages[index + 1..].iter().any(|m| {
                    matches!(m, StoredMessage::Tool { tool_call_id, .. } if *tool_call_id == call.id)
                })
            })
            .map(|call| (call.id.clone(), call.name.clone()))
            .collect();

        unanswered
            .into_iter()
            .map(|(id, name)| {
                let result = error_result("Tool call interrupted");
                state
                    .messages
                    .push(StoredMessage::tool(id.clone(), render_result(&result)));
                OutboundEvent::ToolResult {
                    tool_call_id: id,
                    tool_name: name,
                    result,
                }
            })
            .collect()
    }

    fn open_call<'s>(
        &self,
        state: &'s mut ConversationState,
        id: &str,
    ) -> Option<&'s mut StoredToolCall> {
        let index = self.open?;
        match state.messages.get_mut(index)? {
            StoredMessage::Ai { tool_calls, .. } => tool_calls.iter_mut().find(|call| call.id == id),
            _ => None,
        }
    }

    fn open_turn(&mut self, state: &mut ConversationState) -> usize {
        *self.open.get_or_insert_with(|| {
            state.messages.push(StoredMessage::ai(""));
            state.messages.len() - 1
        })
    }
}

/// Runs requests against a shared turn loop
pub struct Controller<L, T> {
    engine: Arc<TurnLoop<L, T>>,
}

impl<L, T> Clone for Controller<L, T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<L, T> Controller<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(engine: TurnLoop<L, T>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Handle one request.
    ///
    /// The stream always ends with [`OutboundEvent::State`] carrying the
    /// updated state. If the turn loop fails, the snapshot holds everything
    /// streamed so far and is followed by [`OutboundEvent::Error`].
    pub fn handle(
        &self,
        commands: Vec<Command>,
        state: ConversationState,
        system: Option<String>,
    ) -> impl Stream<Item = OutboundEvent> + Send + 'static {
        let engine = Arc::clone(&self.engine);

        stream! {
            let mut state = state;
            let mut messages = prepare_turn(&mut state, &commands);
            let tools = engine.tool_definitions();
            let mut projection = TurnProjection::default();
            let mut failure = None;

            tracing::info!(
                commands = commands.len(),
                history = state.messages.len(),
                "Starting turn loop"
            );

            {
                let mut events = std::pin::pin!(engine.run(&mut messages, &tools, system.as_deref()));
                while let Some(item) = events.next().await {
                    match item {
                        Ok(event) => {
                            yield projection.apply(&mut state, event);
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            if let Some(e) = &failure {
                tracing::error!(error = %e, "Turn loop failed");
                for event in projection.interrupt(&mut state) {
                    yield event;
                }
            } else {
                tracing::info!(messages = state.messages.len(), "Turn loop completed");
            }

            yield OutboundEvent::State { state };

            if let Some(e) = failure {
                yield OutboundEvent::Error { message: e.to_string() };
            }
        }
    }
}
