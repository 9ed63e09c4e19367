//! Tools the model can call
//!
//! Tools return a JSON value. Failures are reported as values too (an
//! object with an `error` key) so the model can see them and react.

mod think;

pub use think::ThinkTool;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::llm::ToolDefinition;

/// Structured error value returned in place of a tool result
pub fn error_result(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

/// Text form of a tool result as fed back to the model: strings verbatim,
/// anything else as compact JSON
pub fn render_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool. Must not panic on malformed input.
    async fn run(&self, input: Value) -> Value;
}

/// Collection of tools available to conversations
///
/// Stateless - tools are singletons shared by every session
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the built-in tools
    pub fn standard() -> Self {
        Self::default().with_tool(ThinkTool)
    }

    /// Register an additional tool. Lookup returns the first tool with a
    /// matching name.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, input: Value) -> Option<Value> {
        for tool in &self.tools {
            if tool.name() == name {
                return Some(tool.run(input).await);
            }
        }
        None
    }
}
