//! Think tool - lets the model reason out loud without side effects

use super::{error_result, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Think tool for LLM reasoning
pub struct ThinkTool;

#[derive(Debug, Deserialize)]
struct ThinkInput {
    thoughts: String,
}

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &'static str {
        "think"
    }

    fn description(&self) -> String {
        "Reason through a request before answering: plan which steps are needed, or reconcile conflicting tool results. No side effects, not shown to the user.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["thoughts"],
            "properties": {
                "thoughts": {
                    "type": "string",
                    "description": "The thoughts, notes, or plans to record"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Value {
        match serde_json::from_value::<ThinkInput>(input) {
            Ok(input) => {
                tracing::debug!(chars = input.thoughts.len(), "Recorded thoughts");
                json!({ "status": "recorded" })
            }
            Err(e) => error_result(format!("Invalid input: {e}")),
        }
    }
}
