//! Mock implementations for testing
//!
//! These mocks script model turns and tool outputs without real I/O.

use super::traits::*;
use crate::llm::{
    BlockStart, ContentBlock, LlmError, LlmEventStream, LlmRequest, LlmResponse, LlmStreamEvent,
    ToolDefinition,
};
use crate::tools::error_result;
use async_trait::async_trait;
use serde_json::Value;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Script = Result<ScriptedStream, LlmError>;

struct ScriptedStream {
    events: Vec<Result<LlmStreamEvent, LlmError>>,
    /// Keep the stream open after the events and flag it when dropped
    hold_open: Option<Arc<AtomicBool>>,
}

impl ScriptedStream {
    fn closed(events: Vec<Result<LlmStreamEvent, LlmError>>) -> Self {
        Self {
            events,
            hold_open: None,
        }
    }

    fn into_stream(self) -> LlmEventStream {
        let events = futures::stream::iter(self.events);
        match self.hold_open {
            None => Box::pin(events),
            Some(dropped) => {
                let guard = DropFlag(dropped);
                Box::pin(events.chain(futures::stream::pending()).map(move |event| {
                    let _guard = &guard;
                    event
                }))
            }
        }
    }
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that replays queued event scripts, one per request
#[allow(dead_code)]
pub struct MockLlmClient {
    scripts: Mutex<VecDeque<Script>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a completed turn, streamed block by block like a real provider
    pub fn queue_response(&self, response: LlmResponse) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Ok(ScriptedStream::closed(stream_events(response))));
    }

    /// Queue a plain text answer
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some("end_turn".to_string()),
            ..Default::default()
        });
    }

    /// Queue a turn with optional leading text and the given tool calls
    pub fn queue_tool_calls(&self, text: &str, calls: &[(&str, &str, Value)]) {
        let mut content = Vec::new();
        if !text.is_empty() {
            content.push(ContentBlock::text(text));
        }
        for (id, name, input) in calls {
            content.push(ContentBlock::tool_use(*id, *name, input.clone()));
        }
        self.queue_response(LlmResponse {
            content,
            stop_reason: Some("tool_use".to_string()),
            ..Default::default()
        });
    }

    /// Queue a raw event script
    pub fn queue_events(&self, events: Vec<Result<LlmStreamEvent, LlmError>>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Ok(ScriptedStream::closed(events)));
    }

    /// Queue events on a stream that never completes. The returned flag is
    /// set once the consumer drops the stream.
    pub fn queue_open_stream(
        &self,
        events: Vec<Result<LlmStreamEvent, LlmError>>,
    ) -> Arc<AtomicBool> {
        let dropped = Arc::new(AtomicBool::new(false));
        self.scripts.lock().unwrap().push_back(Ok(ScriptedStream {
            events,
            hold_open: Some(Arc::clone(&dropped)),
        }));
        dropped
    }

    /// Queue a failure to open the stream
    pub fn queue_error(&self, error: LlmError) {
        self.scripts.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider-shaped event sequence for a finished response. Text is split in
/// two deltas so consumers see chunking.
fn stream_events(response: LlmResponse) -> Vec<Result<LlmStreamEvent, LlmError>> {
    let mut events = Vec::new();
    for (index, block) in response.content.iter().enumerate() {
        match block {
            ContentBlock::Text { text } => {
                events.push(Ok(LlmStreamEvent::BlockStart {
                    index,
                    block: BlockStart::Text,
                }));
                let mid = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
                let (head, tail) = text.split_at(mid);
                for chunk in [head, tail] {
                    if !chunk.is_empty() {
                        events.push(Ok(LlmStreamEvent::TextDelta {
                            index,
                            text: chunk.to_string(),
                        }));
                    }
                }
            }
            ContentBlock::ToolUse { id, name, input } => {
                events.push(Ok(LlmStreamEvent::BlockStart {
                    index,
                    block: BlockStart::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                    },
                }));
                events.push(Ok(LlmStreamEvent::InputJsonDelta {
                    index,
                    partial_json: input.to_string(),
                }));
            }
            ContentBlock::ToolResult { .. } => continue,
        }
        events.push(Ok(LlmStreamEvent::BlockStop { index }));
    }
    events.push(Ok(LlmStreamEvent::Completed(response)));
    events
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))?;
        Ok(script.into_stream())
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with predefined outputs
#[allow(dead_code)]
pub struct MockToolExecutor {
    outputs: HashMap<String, Value>,
    definitions: Vec<ToolDefinition>,
    /// Record of tool executions
    pub executions: Mutex<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            definitions: Vec::new(),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Add a tool with a predefined output
    pub fn with_tool(mut self, name: impl Into<String>, output: Value) -> Self {
        let name = name.into();
        self.definitions.push(ToolDefinition {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        self.outputs.insert(name, output);
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, name: &str, input: Value) -> Value {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        self.outputs
            .get(name)
            .cloned()
            .unwrap_or_else(|| error_result(format!("Unknown tool: {name}")))
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}
