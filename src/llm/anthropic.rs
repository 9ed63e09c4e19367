//! Anthropic Claude provider implementation
//!
//! Uses the Messages API with `stream: true` and decodes the server-sent
//! event stream incrementally.

use super::stream::ResponseBuilder;
use super::types::*;
use super::{LlmError, LlmEventStream, LlmService};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl AnthropicService {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        let api_url = match base_url {
            Some(url) => format!("{}/v1/messages", url.trim_end_matches('/')),
            None => DEFAULT_API_URL.to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_url,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .map(translate_message)
            .collect();

        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone().filter(|s| !s.is_empty()),
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            stream: true,
        }
    }
}

fn translate_message(msg: &LlmMessage) -> AnthropicMessage {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    let content = match &msg.content {
        MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
        MessageContent::Blocks(blocks) => AnthropicContent::Blocks(
            blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                    ContentBlock::ToolUse { id, name, input } => AnthropicContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    },
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } => AnthropicContentBlock::ToolResult {
                        tool_use_id: tool_use_id.clone(),
                        content: content.clone(),
                    },
                })
                .collect(),
        ),
    };

    AnthropicMessage {
        role: role.to_string(),
        content,
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
        429 => LlmError::rate_limit(format!("Rate limited: {body}")),
        400 => LlmError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => LlmError::server_error(format!("Server error: {body}")),
        _ => LlmError::unknown(format!("HTTP {status}: {body}")),
    }
}

/// Map one Anthropic stream event onto generic stream events.
///
/// `Ok(None)` marks `message_stop`.
fn translate_event(event: AnthropicStreamEvent) -> Result<Option<Vec<LlmStreamEvent>>, LlmError> {
    let events = match event {
        AnthropicStreamEvent::MessageStart { message } => {
            let usage = message.usage.unwrap_or_default();
            vec![LlmStreamEvent::MessageStart {
                usage: Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                },
            }]
        }
        AnthropicStreamEvent::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            AnthropicBlockStart::Text { text } => {
                let mut events = vec![LlmStreamEvent::BlockStart {
                    index,
                    block: BlockStart::Text,
                }];
                if !text.is_empty() {
                    events.push(LlmStreamEvent::TextDelta { index, text });
                }
                events
            }
            AnthropicBlockStart::ToolUse { id, name } => vec![LlmStreamEvent::BlockStart {
                index,
                block: BlockStart::ToolUse { id, name },
            }],
            AnthropicBlockStart::Other => {
                tracing::debug!(index, "Skipping unsupported content block");
                Vec::new()
            }
        },
        AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
            AnthropicDelta::TextDelta { text } => vec![LlmStreamEvent::TextDelta { index, text }],
            AnthropicDelta::InputJsonDelta { partial_json } => {
                vec![LlmStreamEvent::InputJsonDelta {
                    index,
                    partial_json,
                }]
            }
            AnthropicDelta::Other => Vec::new(),
        },
        AnthropicStreamEvent::ContentBlockStop { index } => {
            vec![LlmStreamEvent::BlockStop { index }]
        }
        AnthropicStreamEvent::MessageDelta { delta, usage } => {
            vec![LlmStreamEvent::MessageDelta {
                stop_reason: delta.stop_reason,
                output_tokens: usage.map(|u| u.output_tokens),
            }]
        }
        AnthropicStreamEvent::MessageStop => return Ok(None),
        AnthropicStreamEvent::Error { error } => {
            return Err(LlmError::server_error(format!(
                "Anthropic stream error ({}): {}",
                error.r#type, error.message
            )));
        }
        AnthropicStreamEvent::Ping | AnthropicStreamEvent::Unknown => Vec::new(),
    };
    Ok(Some(events))
}

/// Decode a raw SSE byte stream into generic stream events
fn decode_sse<S, B, E>(bytes: S) -> impl Stream<Item = Result<LlmStreamEvent, LlmError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut events = Box::pin(bytes.eventsource());

    async_stream::try_stream! {
        let mut builder = ResponseBuilder::new();
        let mut completed = false;

        while let Some(sse) = events.next().await {
            let sse = sse.map_err(|e| LlmError::network(format!("Stream error: {e}")))?;
            let parsed: AnthropicStreamEvent = serde_json::from_str(&sse.data).map_err(|e| {
                LlmError::unknown(format!("Failed to parse stream event: {e} - data: {}", sse.data))
            })?;

            match translate_event(parsed)? {
                Some(translated) => {
                    for event in translated {
                        builder.observe(&event);
                        yield event;
                    }
                }
                None => {
                    completed = true;
                    break;
                }
            }
        }

        if !completed {
            Err(LlmError::network("Stream ended before message_stop"))?;
        }

        yield LlmStreamEvent::Completed(builder.finish()?);
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                LlmError::network(format!("Failed to read error response: {e}"))
            })?;
            return Err(classify_error(status, &body));
        }

        Ok(Box::pin(decode_sse(response.bytes_stream())))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicService")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

// Streaming response types

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    MessageStart {
        message: AnthropicMessageInfo,
    },
    ContentBlockStart {
        index: usize,
        content_block: AnthropicBlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: AnthropicDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: AnthropicMessageDeltaData,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicErrorBody,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageInfo {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageDeltaData {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    r#type: String,
    message: String,
}
