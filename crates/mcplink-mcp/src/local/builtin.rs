//! Built-in local tools and prompts

use mcplink_core::LogSeverity;
use rmcp::model::{
    CallToolResult, Content, CreateElicitationRequestParams, CreateMessageRequestParams,
    JsonObject,
};
use rmcp::ErrorData as McpError;
use serde_json::{json, Value};

use super::registry::{PromptArgumentSpec, PromptRegistry, ToolContext, ToolRegistry};

pub const NO_ANSWER_TEXT: &str = "The user did not provide an answer";

pub fn register_defaults(tools: &mut ToolRegistry, prompts: &mut PromptRegistry) {
    tools
        .register(
            "reverse_string",
            "Reverse the characters of a string",
            text_schema("text", "Text to reverse"),
            reverse_string,
        )
        .register(
            "time_now",
            "Current local date, time and UTC offset",
            json!({"type": "object", "properties": {}}),
            time_now,
        )
        .register(
            "summarize",
            "Summarize text using the client's model",
            text_schema("text", "Text to summarize"),
            summarize,
        )
        .register(
            "ask_user",
            "Ask the user a question and return the answer",
            text_schema("question", "Question shown to the user"),
            ask_user,
        )
        .register(
            "list_roots",
            "List the roots the client exposes",
            json!({"type": "object", "properties": {}}),
            list_roots,
        );

    prompts.register(
        "summarize_text",
        "Summarize a piece of text in a few sentences",
        vec![PromptArgumentSpec::required("text", "Text to summarize")],
        "Summarize the following text in at most three sentences:\n\n{text}",
    );
}

fn text_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {field: {"type": "string", "description": description}},
        "required": [field],
    })
}

fn string_arg(args: &JsonObject, field: &str) -> Result<String, McpError> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| McpError::invalid_params(format!("'{field}' must be a string"), None))
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Text of a content block or array of blocks, concatenated.
fn content_text(content: &Value) -> String {
    match content {
        Value::Array(items) => items.iter().map(content_text).collect(),
        Value::Object(obj) => obj
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

async fn reverse_string(ctx: ToolContext, args: JsonObject) -> Result<CallToolResult, McpError> {
    let text = string_arg(&args, "text")?;
    ctx.log(LogSeverity::Debug, json!({"chars": text.chars().count()}))
        .await;
    Ok(text_result(text.chars().rev().collect::<String>()))
}

async fn time_now(_ctx: ToolContext, _args: JsonObject) -> Result<CallToolResult, McpError> {
    let now = chrono::Local::now();
    Ok(text_result(now.format("%Y-%m-%d %H:%M:%S %:z").to_string()))
}

async fn summarize(ctx: ToolContext, args: JsonObject) -> Result<CallToolResult, McpError> {
    let text = string_arg(&args, "text")?;
    ctx.log(LogSeverity::Info, json!("Requesting summary from client"))
        .await;

    let params: CreateMessageRequestParams = serde_json::from_value(json!({
        "messages": [{"role": "user", "content": {"type": "text", "text": text}}],
        "systemPrompt": "Summarize the user's text in a few sentences.",
        "maxTokens": 512,
    }))
    .map_err(|e| McpError::internal_error(format!("failed to build sampling request: {e}"), None))?;

    match ctx.peer().create_message(params).await {
        Ok(result) => {
            let result = serde_json::to_value(&result).unwrap_or_default();
            Ok(text_result(content_text(&result["content"])))
        }
        Err(e) => {
            ctx.log(LogSeverity::Warning, json!(format!("Sampling failed: {e}")))
                .await;
            Ok(CallToolResult::error(vec![Content::text(format!(
                "Sampling failed: {e}"
            ))]))
        }
    }
}

async fn ask_user(ctx: ToolContext, args: JsonObject) -> Result<CallToolResult, McpError> {
    let question = string_arg(&args, "question")?;

    let params: CreateElicitationRequestParams = serde_json::from_value(json!({
        "mode": "form",
        "message": question,
        "requestedSchema": {
            "type": "object",
            "properties": {"answer": {"type": "string", "description": "Your answer"}},
            "required": ["answer"],
        },
    }))
    .map_err(|e| {
        McpError::internal_error(format!("failed to build elicitation request: {e}"), None)
    })?;

    let result = match ctx.peer().create_elicitation(params).await {
        Ok(result) => serde_json::to_value(&result).unwrap_or_default(),
        Err(e) => {
            ctx.log(LogSeverity::Warning, json!(format!("Elicitation failed: {e}")))
                .await;
            return Ok(text_result(NO_ANSWER_TEXT));
        }
    };

    // decline and cancel are ordinary outcomes, not tool errors
    let answer = match result["action"].as_str() {
        Some("accept") => result["content"]["answer"].as_str().map(str::to_string),
        _ => None,
    };
    Ok(text_result(answer.unwrap_or_else(|| NO_ANSWER_TEXT.to_string())))
}

async fn list_roots(ctx: ToolContext, _args: JsonObject) -> Result<CallToolResult, McpError> {
    let roots = match ctx.peer().list_roots().await {
        Ok(result) => serde_json::to_value(&result).unwrap_or_default(),
        Err(e) => {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to list roots: {e}"
            ))]))
        }
    };

    let lines: Vec<String> = roots["roots"]
        .as_array()
        .map(|roots| {
            roots
                .iter()
                .map(|root| match root["name"].as_str() {
                    Some(name) => format!("{name}: {}", root["uri"].as_str().unwrap_or_default()),
                    None => root["uri"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        return Ok(text_result("No roots"));
    }
    Ok(text_result(lines.join("\n")))
}
