//! Inbound commands and request payload

use super::message::ConversationState;
use serde::Deserialize;
use serde_json::Value;

/// Request body for one `/assistant` call
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub system: Option<String>,
    /// Client-declared tools; the server's own registry is authoritative
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default, rename = "runConfig", alias = "run_config")]
    pub run_config: Option<Value>,
    #[serde(default)]
    pub state: Option<ConversationState>,
}

/// A change the client asks to apply before the model runs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    AddMessage {
        message: UserMessage,
    },
    AddToolResult {
        #[serde(rename = "toolCallId", alias = "tool_call_id")]
        tool_call_id: String,
        #[serde(default, rename = "toolName", alias = "tool_name")]
        tool_name: Option<String>,
        #[serde(default)]
        result: Value,
    },
    /// Any other command type; ignored
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl UserMessage {
    /// Text parts joined with single spaces; `None` when there is no text
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .parts
            .iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.as_deref())
            .filter(|text| !text.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// One part of a user message. Non-text parts (images, files) are accepted
/// and ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}
