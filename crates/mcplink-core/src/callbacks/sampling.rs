//! Sampling: a peer asks the client to run a completion on its behalf.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::chat::{ChatCompletion, ChatContent, ChatMessage, ChatOptions, ChatRole, FinishReason};

pub(crate) const MISSING_REQUEST_TEXT: &str = "The input prompts to the model are missing";
pub(crate) const INVALID_RESPONSE_TEXT: &str = "Invalid LLM response: message count != 1";

/// A `sampling/createMessage` request, in wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRequest {
    #[serde(default)]
    pub messages: Vec<SamplingMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    pub role: ChatRole,
    /// A single content block or an array of them
    pub content: Value,
}

impl SamplingMessage {
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: serde_json::json!({"type": "text", "text": text.into()}),
        }
    }

    /// Content blocks this message carries. Unknown block types are dropped.
    pub fn content_blocks(&self) -> Vec<ChatContent> {
        let blocks: Vec<&Value> = match &self.content {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        blocks
            .into_iter()
            .filter_map(|block| match serde_json::from_value::<ChatContent>(block.clone()) {
                Ok(content) => Some(content),
                Err(_) => {
                    debug!(block = %block, "Skipping unsupported sampling content");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

/// Result returned to the peer. Serializes as `{model, stopReason, role, content}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingResult {
    pub model: String,
    pub stop_reason: StopReason,
    pub role: ChatRole,
    pub content: ChatContent,
}

impl SamplingResult {
    /// In-band error: the peer still receives a well-formed envelope.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            stop_reason: StopReason::EndTurn,
            role: ChatRole::Assistant,
            content: ChatContent::text(text),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

pub(crate) fn build_messages(request: &SamplingRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::text(ChatRole::System, system));
    }
    messages.extend(
        request
            .messages
            .iter()
            .map(|m| ChatMessage::new(m.role, m.content_blocks())),
    );
    messages
}

pub(crate) fn build_options(request: &SamplingRequest) -> Option<ChatOptions> {
    let options = ChatOptions {
        model_id: None,
        max_output_tokens: request.max_tokens,
        temperature: request.temperature,
        stop_sequences: request.stop_sequences.clone(),
    };
    (!options.is_empty()).then_some(options)
}

pub(crate) async fn sample(
    completion: &dyn ChatCompletion,
    peer: &str,
    request: Option<SamplingRequest>,
) -> SamplingResult {
    let Some(request) = request else {
        warn!(peer, "Sampling request without parameters");
        return SamplingResult::error_text(MISSING_REQUEST_TEXT);
    };

    let messages = build_messages(&request);
    let options = build_options(&request);
    debug!(peer, messages = messages.len(), "Running sampling completion");

    let response = match completion.complete(messages, options).await {
        Ok(response) => response,
        Err(e) => {
            warn!(peer, error = %e, "Sampling completion failed");
            return SamplingResult::error_text(format!("Sampling failed: {e}"));
        }
    };

    if response.messages.len() != 1 {
        warn!(peer, count = response.messages.len(), "Unexpected sampling response");
        return SamplingResult::error_text(INVALID_RESPONSE_TEXT);
    }
    let Some(message) = response.messages.last() else {
        return SamplingResult::error_text(INVALID_RESPONSE_TEXT);
    };

    let content = match message.first_image() {
        Some(image) => image.clone(),
        None => ChatContent::text(message.joined_text()),
    };
    let stop_reason = match response.finish_reason {
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    SamplingResult {
        model: response.model_id.unwrap_or_else(|| "unknown".to_string()),
        stop_reason,
        role: match message.role {
            ChatRole::User => ChatRole::User,
            _ => ChatRole::Assistant,
        },
        content,
    }
}
