//! Turn loop engine
//!
//! A run streams model turns and executes tool calls until the model
//! produces a turn without tool calls. The transcript is borrowed mutably
//! for the whole run, so the caller keeps every appended turn even if the
//! stream is dropped halfway.

use super::event::{AgentError, AgentEvent};
use super::traits::{LlmClient, ToolExecutor};
use crate::llm::{
    BlockStart, ContentBlock, LlmError, LlmMessage, LlmRequest, LlmResponse, LlmStreamEvent,
    ToolDefinition,
};
use crate::tools::render_result;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::Value;

/// Limits applied to every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum model requests per run
    pub max_iterations: usize,
    pub max_tokens: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            max_tokens: 4096,
        }
    }
}

/// Drives model turns and tool calls for one conversation at a time
pub struct TurnLoop<L, T> {
    llm: L,
    tools: T,
    config: LoopConfig,
}

impl<L, T> TurnLoop<L, T>
where
    L: LlmClient,
    T: ToolExecutor,
{
    pub fn new(llm: L, tools: T, config: LoopConfig) -> Self {
        Self { llm, tools, config }
    }

    /// Schemas of the tools this loop can execute
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Run the loop over `messages`, appending each assistant turn and each
    /// batch of tool results to it.
    ///
    /// Text deltas and tool call starts are yielded as they stream in. Tool
    /// arguments are yielded once the turn is complete. Tools run one at a
    /// time in the order the model declared them. Model failures end the
    /// stream with an error.
    pub fn run<'a>(
        &'a self,
        messages: &'a mut Vec<LlmMessage>,
        tools: &'a [ToolDefinition],
        system: Option<&'a str>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + Send + 'a {
        try_stream! {
            let mut iteration = 0usize;
            loop {
                if iteration >= self.config.max_iterations {
                    tracing::warn!(
                        max_iterations = self.config.max_iterations,
                        "Turn loop hit iteration limit"
                    );
                    Err(AgentError::IterationLimit(self.config.max_iterations))?;
                }
                iteration += 1;

                let request = LlmRequest {
                    system: system.map(str::to_string),
                    messages: messages.clone(),
                    tools: tools.to_vec(),
                    max_tokens: self.config.max_tokens,
                };
                tracing::debug!(
                    iteration,
                    messages = request.messages.len(),
                    "Requesting model turn"
                );

                let mut stream = self.llm.stream(&request).await?;
                let mut completed: Option<LlmResponse> = None;
                while let Some(event) = stream.next().await {
                    match event? {
                        LlmStreamEvent::TextDelta { text, .. } => {
                            if !text.is_empty() {
                                yield AgentEvent::TextDelta { text };
                            }
                        }
                        LlmStreamEvent::BlockStart {
                            block: BlockStart::ToolUse { id, name },
                            ..
                        } => {
                            yield AgentEvent::ToolCallStart { id, name };
                        }
                        LlmStreamEvent::Completed(response) => {
                            completed = Some(response);
                        }
                        _ => {}
                    }
                }
                drop(stream);

                let response = completed
                    .ok_or_else(|| LlmError::network("Model stream ended before the turn completed"))?;
                tracing::debug!(
                    iteration,
                    stop_reason = ?response.stop_reason,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Model turn completed"
                );

                let calls: Vec<(String, String, Value)> = response
                    .tool_uses()
                    .into_iter()
                    .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                    .collect();
                for (id, name, args) in &calls {
                    yield AgentEvent::ToolCallArgs {
                        id: id.clone(),
                        name: name.clone(),
                        args: args.clone(),
                    };
                }

                let assistant: Vec<ContentBlock> = response
                    .content
                    .into_iter()
                    .filter(|block| !matches!(block, ContentBlock::Text { text } if text.is_empty()))
                    .collect();

                if calls.is_empty() {
                    if !assistant.is_empty() {
                        messages.push(LlmMessage::assistant_blocks(assistant));
                    }
                    tracing::debug!(iteration, "Turn loop finished");
                    break;
                }

                messages.push(LlmMessage::assistant_blocks(assistant));

                let mut results = Vec::with_capacity(calls.len());
                for (id, name, args) in calls {
                    tracing::info!(tool = %name, tool_use_id = %id, "Executing tool");
                    let result = self.tools.execute(&name, args).await;
                    results.push(ContentBlock::tool_result(id.clone(), render_result(&result)));
                    yield AgentEvent::ToolResult { id, name, result };
                }
                messages.push(LlmMessage::user_blocks(results));
            }
        }
    }
}
