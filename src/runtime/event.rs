//! Events produced by the turn loop

use crate::llm::LlmError;
use serde_json::Value;
use thiserror::Error;

/// One observable step of a turn loop run
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A chunk of assistant text
    TextDelta { text: String },
    /// The model opened a tool_use block; arguments are not known yet
    ToolCallStart { id: String, name: String },
    /// Complete arguments for a tool call, available once the turn is materialized
    ToolCallArgs { id: String, name: String, args: Value },
    /// Result returned by the tool executor
    ToolResult { id: String, name: String, result: Value },
}

/// Fatal errors that abort a run
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Tool loop stopped after {0} model requests without a final answer")]
    IterationLimit(usize),
}
