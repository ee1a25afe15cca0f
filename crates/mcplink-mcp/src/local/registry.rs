//! Explicit tool and prompt tables for the local server
//!
//! Everything is registered up front: a name, a schema and a handler. There is no discovery at
//! runtime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use mcplink_core::LogSeverity;
use parking_lot::RwLock;
use rmcp::model::{
    CallToolResult, GetPromptResult, JsonObject, LoggingMessageNotificationParam, Prompt, Tool,
};
use rmcp::service::Peer;
use rmcp::{ErrorData as McpError, RoleServer};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Shared minimum level set by the client through `logging/setLevel`.
pub type LevelFilter = Arc<RwLock<Option<LogSeverity>>>;

/// What a tool handler can reach while it runs.
#[derive(Clone)]
pub struct ToolContext {
    peer: Peer<RoleServer>,
    logger: String,
    min_level: LevelFilter,
}

impl ToolContext {
    pub fn new(peer: Peer<RoleServer>, logger: impl Into<String>, min_level: LevelFilter) -> Self {
        Self {
            peer,
            logger: logger.into(),
            min_level,
        }
    }

    /// Connection to the client, for sampling, elicitation and roots requests.
    pub fn peer(&self) -> &Peer<RoleServer> {
        &self.peer
    }

    /// Send `notifications/message` if `level` passes the client's filter.
    ///
    /// Nothing is sent until the client has chosen a level.
    pub async fn log(&self, level: LogSeverity, data: Value) {
        let Some(min) = *self.min_level.read() else {
            return;
        };
        if level < min {
            return;
        }

        let param: LoggingMessageNotificationParam = match serde_json::from_value(json!({
            "level": level.as_str(),
            "logger": self.logger,
            "data": data,
        })) {
            Ok(param) => param,
            Err(e) => {
                warn!(error = %e, "Failed to build log notification");
                return;
            }
        };
        if let Err(e) = self.peer.notify_logging_message(param).await {
            debug!(error = %e, "Failed to send log notification");
        }
    }
}

type ToolHandler =
    Arc<dyn Fn(ToolContext, JsonObject) -> BoxFuture<'static, Result<CallToolResult, McpError>> + Send + Sync>;

struct ToolEntry {
    tool: Tool,
    handler: ToolHandler,
}

#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration with the same name replaces the earlier one.
    pub fn register<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(ToolContext, JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, McpError>> + Send + 'static,
    {
        let schema: JsonObject = match input_schema {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        let entry = ToolEntry {
            tool: Tool::new(name.to_string(), description.to_string(), Arc::new(schema)),
            handler: Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
        };

        self.entries.retain(|e| e.tool.name != name);
        self.entries.push(entry);
        self
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.tool.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.tool.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn call(
        &self,
        name: &str,
        ctx: ToolContext,
        arguments: JsonObject,
    ) -> Result<CallToolResult, McpError> {
        let Some(entry) = self.entries.iter().find(|e| e.tool.name == name) else {
            return Err(McpError::invalid_params(format!("unknown tool: {name}"), None));
        };
        (entry.handler)(ctx, arguments).await
    }
}

/// One prompt argument.
#[derive(Debug, Clone)]
pub struct PromptArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PromptArgumentSpec {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, description)
        }
    }
}

/// A prompt rendered by substituting `{argument}` placeholders in a template.
#[derive(Debug, Clone)]
struct PromptEntry {
    name: String,
    description: String,
    arguments: Vec<PromptArgumentSpec>,
    template: String,
}

impl PromptEntry {
    fn to_prompt(&self) -> Result<Prompt, serde_json::Error> {
        let arguments: Vec<Value> = self
            .arguments
            .iter()
            .map(|a| json!({"name": a.name, "description": a.description, "required": a.required}))
            .collect();
        serde_json::from_value(json!({
            "name": self.name,
            "description": self.description,
            "arguments": arguments,
        }))
    }

    fn render(&self, arguments: &JsonObject) -> Result<String, McpError> {
        let mut values = HashMap::with_capacity(self.arguments.len());
        for arg in &self.arguments {
            let value = match arguments.get(&arg.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None if arg.required => {
                    return Err(McpError::invalid_params(
                        format!("missing required argument '{}'", arg.name),
                        None,
                    ))
                }
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            values.insert(arg.name.as_str(), value);
        }

        // single pass: substituted values are never rescanned
        let mut text = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            text.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| Some((close, values.get(&after[..close])?))) {
                Some((close, value)) => {
                    text.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    text.push('{');
                    rest = after;
                }
            }
        }
        text.push_str(rest);
        Ok(text)
    }
}

#[derive(Debug, Default)]
pub struct PromptRegistry {
    entries: Vec<PromptEntry>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        arguments: Vec<PromptArgumentSpec>,
        template: &str,
    ) -> &mut Self {
        self.entries.retain(|e| e.name != name);
        self.entries.push(PromptEntry {
            name: name.to_string(),
            description: description.to_string(),
            arguments,
            template: template.to_string(),
        });
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.entries
            .iter()
            .filter_map(|e| match e.to_prompt() {
                Ok(prompt) => Some(prompt),
                Err(err) => {
                    warn!(prompt = %e.name, error = %err, "Skipping prompt that cannot be listed");
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str, arguments: Option<JsonObject>) -> Result<GetPromptResult, McpError> {
        let Some(entry) = self.entries.iter().find(|e| e.name == name) else {
            return Err(McpError::invalid_params(format!("unknown prompt: {name}"), None));
        };
        let text = entry.render(&arguments.unwrap_or_default())?;

        serde_json::from_value(json!({
            "description": entry.description,
            "messages": [{"role": "user", "content": {"type": "text", "text": text}}],
        }))
        .map_err(|e| McpError::internal_error(format!("failed to build prompt: {e}"), None))
    }
}
