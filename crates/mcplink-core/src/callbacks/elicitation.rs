//! Elicitation: a peer asks the human operator for a value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::prompt::UserPrompt;

/// An `elicitation/create` request, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElicitationRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_schema: Option<Value>,
}

impl ElicitationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            requested_schema: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationAction {
    Accept,
    Decline,
    Cancel,
}

/// Result returned to the peer: `{"action": "accept", "content": {"answer": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElicitationResponse {
    pub action: ElicitationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
}

impl ElicitationResponse {
    pub fn accept(answer: impl Into<String>) -> Self {
        let mut content = Map::new();
        content.insert("answer".to_string(), Value::String(answer.into()));
        Self {
            action: ElicitationAction::Accept,
            content: Some(content),
        }
    }

    pub fn decline() -> Self {
        Self {
            action: ElicitationAction::Decline,
            content: None,
        }
    }

    pub fn cancel() -> Self {
        Self {
            action: ElicitationAction::Cancel,
            content: None,
        }
    }

    /// The `answer` field of an accepted response.
    pub fn answer(&self) -> Option<&str> {
        match self.action {
            ElicitationAction::Accept => self.content.as_ref()?.get("answer")?.as_str(),
            _ => None,
        }
    }
}

pub(crate) async fn elicit(
    prompt: &dyn UserPrompt,
    peer: &str,
    request: Option<ElicitationRequest>,
) -> ElicitationResponse {
    let Some(request) = request else {
        warn!(peer, "Elicitation request without parameters, cancelling");
        return ElicitationResponse::cancel();
    };

    match prompt.ask(peer, &request.message).await {
        Ok(Some(line)) => {
            debug!(peer, "Elicitation answered");
            ElicitationResponse::accept(line)
        }
        Ok(None) => {
            debug!(peer, "Input closed, cancelling elicitation");
            ElicitationResponse::cancel()
        }
        Err(e) => {
            warn!(peer, error = %e, "Failed to read elicitation answer");
            ElicitationResponse::cancel()
        }
    }
}
