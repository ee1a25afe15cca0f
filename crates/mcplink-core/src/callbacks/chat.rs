//! Chat completion collaborator
//!
//! The orchestrator owns the actual model. Sampling only needs a narrow view of it: a list of
//! messages in, a response with messages out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One content block.
///
/// Serializes in the MCP content-block shape (`{"type": "text", "text": ...}`), so a block can be
/// returned to a peer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ChatContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub contents: Vec<ChatContent>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, contents: Vec<ChatContent>) -> Self {
        Self { role, contents }
    }

    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self::new(role, vec![ChatContent::text(text)])
    }

    /// Concatenation of every text block.
    pub fn joined_text(&self) -> String {
        self.contents.iter().filter_map(ChatContent::as_text).collect()
    }

    pub fn first_image(&self) -> Option<&ChatContent> {
        self.contents
            .iter()
            .find(|c| matches!(c, ChatContent::Image { .. }))
    }
}

/// Completion options. `model_id` is left to the orchestrator when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model_id: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
}

impl ChatOptions {
    pub fn is_empty(&self) -> bool {
        self.model_id.is_none()
            && self.max_output_tokens.is_none()
            && self.temperature.is_none()
            && self.stop_sequences.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
    pub model_id: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatResponse {
    pub fn single(message: ChatMessage) -> Self {
        Self {
            messages: vec![message],
            ..Default::default()
        }
    }
}

/// The orchestrator's chat backend, as seen by the sampling handler.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: Option<ChatOptions>,
    ) -> anyhow::Result<ChatResponse>;
}

/// Backend used when no model is wired in. Every sampling request is answered in-band.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCompletion;

#[async_trait]
impl ChatCompletion for UnavailableCompletion {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _options: Option<ChatOptions>,
    ) -> anyhow::Result<ChatResponse> {
        anyhow::bail!("sampling is not configured for this client")
    }
}
