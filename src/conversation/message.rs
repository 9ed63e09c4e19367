//! Persisted conversation messages
//!
//! Messages are stored in the client's state in a LangChain-style shape:
//! `{"type": "human" | "ai" | "tool", "content": ..., "tool_calls": [...],
//! "tool_call_id": ...}`. Entries of any other shape are kept verbatim.
//! Recognised entries are re-serialized in that shape, so keys outside it
//! are not carried over.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry in the conversation history
#[derive(Debug, Clone, PartialEq)]
pub enum StoredMessage {
    Human {
        content: String,
    },
    Ai {
        content: String,
        tool_calls: Vec<StoredToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
    /// Unrecognized entry, preserved as-is and skipped when building model input
    Other(Value),
}

impl StoredMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }
}

/// A tool call recorded on an `ai` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToolCall {
    pub id: String,
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

impl StoredToolCall {
    /// Call whose arguments have not streamed in yet
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: empty_args(),
        }
    }
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

/// Conversation state round-tripped through the client
///
/// Only `messages` is interpreted; any other keys are passed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Tagged {
    Human {
        #[serde(default)]
        content: String,
    },
    Ai {
        #[serde(default)]
        content: String,
        #[serde(default, alias = "toolCalls")]
        tool_calls: Vec<StoredToolCall>,
    },
    Tool {
        #[serde(default)]
        content: String,
        #[serde(alias = "toolCallId")]
        tool_call_id: String,
    },
}

impl From<Tagged> for StoredMessage {
    fn from(tagged: Tagged) -> Self {
        match tagged {
            Tagged::Human { content } => Self::Human { content },
            Tagged::Ai {
                content,
                tool_calls,
            } => Self::Ai {
                content,
                tool_calls,
            },
            Tagged::Tool {
                content,
                tool_call_id,
            } => Self::Tool {
                content,
                tool_call_id,
            },
        }
    }
}

impl<'de> Deserialize<'de> for StoredMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match Tagged::deserialize(&value) {
            Ok(tagged) => tagged.into(),
            Err(_) => Self::Other(value),
        })
    }
}

impl Serialize for StoredMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Human { content } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "human")?;
                map.serialize_entry("content", content)?;
                map.end()
            }
            Self::Ai {
                content,
                tool_calls,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "ai")?;
                map.serialize_entry("content", content)?;
                if !tool_calls.is_empty() {
                    map.serialize_entry("tool_calls", tool_calls)?;
                }
                map.end()
            }
            Self::Tool {
                content,
                tool_call_id,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "tool")?;
                map.serialize_entry("content", content)?;
                map.serialize_entry("tool_call_id", tool_call_id)?;
                map.end()
            }
            Self::Other(value) => value.serialize(serializer),
        }
    }
}
