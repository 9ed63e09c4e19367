//! Stand-in model used when no API key is configured

use super::types::{BlockStart, ContentBlock, LlmRequest, LlmResponse, LlmStreamEvent};
use super::{LlmError, LlmEventStream, LlmService};
use async_trait::async_trait;

pub const OFFLINE_REPLY: &str = "I would help you, but no ANTHROPIC_API_KEY is configured. \
Please set your API key in the .env file.";

/// Answers every request with a fixed notice and no tool calls
#[derive(Debug, Default)]
pub struct OfflineService;

#[async_trait]
impl LlmService for OfflineService {
    async fn stream(&self, _request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        let events = vec![
            Ok(LlmStreamEvent::BlockStart {
                index: 0,
                block: BlockStart::Text,
            }),
            Ok(LlmStreamEvent::TextDelta {
                index: 0,
                text: OFFLINE_REPLY.to_string(),
            }),
            Ok(LlmStreamEvent::BlockStop { index: 0 }),
            Ok(LlmStreamEvent::Completed(LlmResponse {
                content: vec![ContentBlock::text(OFFLINE_REPLY)],
                stop_reason: Some("end_turn".to_string()),
                ..Default::default()
            })),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn model_id(&self) -> &'static str {
        "offline"
    }
}
