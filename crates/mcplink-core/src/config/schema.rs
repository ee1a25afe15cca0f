//! Transport schema detection for a single peer entry.
//!
//! Detection order is stdio, then HTTP, then in-process. The first schema whose required field
//! is present wins:
//! - stdio needs `command`
//! - HTTP needs `url` or `endpoint` holding an absolute URI
//! - in-process accepts any remaining object
//!
//! An entry without `command` falls through to HTTP, and an entry without a usable URL falls
//! through to in-process. A required field that is present with the wrong JSON type is an
//! error, not a fall-through.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

use super::error::SchemaError;
use crate::domain::{
    parse_timeout, HttpSpec, HttpTransportMode, InProcessSpec, PeerTransport, StdioSpec,
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT,
};

/// Detect which transport a peer entry describes.
///
/// Returns `Ok(None)` when the entry matches no schema (for example a JSON string).
pub fn detect_transport(entry: &Value) -> Result<Option<PeerTransport>, SchemaError> {
    let Value::Object(obj) = entry else {
        warn!(kind = json_kind(entry), "Expected an object for peer entry");
        return Ok(None);
    };

    if let Some(spec) = read_stdio(obj)? {
        return Ok(Some(PeerTransport::Stdio(spec)));
    }
    if let Some(spec) = read_http(obj)? {
        return Ok(Some(PeerTransport::Http(spec)));
    }
    Ok(Some(PeerTransport::InProcess(read_in_process(obj))))
}

fn read_stdio(obj: &Map<String, Value>) -> Result<Option<StdioSpec>, SchemaError> {
    let command = match obj.get("command") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => return Err(SchemaError::new("command", "a non-empty string")),
    };

    let args = match first_present(obj, &["args", "arguments"]) {
        Some((field, value)) => string_list(field, value)?,
        None => Vec::new(),
    };

    let environment_variables = match first_present(obj, &["environmentVariables", "env"]) {
        Some((field, Value::Object(map))) => {
            let mut env = HashMap::with_capacity(map.len());
            for (key, value) in map {
                let value = match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    _ => return Err(SchemaError::new(field, "an object of strings or nulls")),
                };
                env.insert(key.clone(), value);
            }
            env
        }
        Some((field, _)) => return Err(SchemaError::new(field, "an object of strings or nulls")),
        None => HashMap::new(),
    };

    let shutdown_timeout = match obj.get("shutdownTimeout") {
        None | Some(Value::Null) => DEFAULT_SHUTDOWN_TIMEOUT,
        Some(value) => parse_timeout(value).unwrap_or_else(|| {
            warn!(value = %value, "Unrecognised shutdownTimeout, using default");
            DEFAULT_SHUTDOWN_TIMEOUT
        }),
    };

    Ok(Some(StdioSpec {
        command,
        args,
        name: optional_string(obj, "name")?,
        working_directory: match first_present(obj, &["workingDirectory", "cwd"]) {
            Some((_, Value::String(s))) => Some(s.clone()),
            Some((field, _)) => return Err(SchemaError::new(field, "a string")),
            None => None,
        },
        environment_variables,
        shutdown_timeout,
    }))
}

fn read_http(obj: &Map<String, Value>) -> Result<Option<HttpSpec>, SchemaError> {
    let raw = match first_present(obj, &["url", "endpoint"]) {
        None => return Ok(None),
        Some((_, Value::String(s))) => s,
        Some((field, _)) => return Err(SchemaError::new(field, "a string")),
    };

    // Url::parse only succeeds for absolute URIs
    let Ok(endpoint) = Url::parse(raw.trim()) else {
        warn!(url = %raw, "Endpoint is not an absolute URI");
        return Ok(None);
    };

    let transport_mode = match obj.get("useStreamableHttp") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => HttpTransportMode::AutoDetect,
        Some(Value::Bool(true)) => HttpTransportMode::StreamableHttp,
        Some(_) => return Err(SchemaError::new("useStreamableHttp", "a boolean")),
    };

    let connection_timeout = match obj.get("connectionTimeout") {
        None | Some(Value::Null) => DEFAULT_CONNECTION_TIMEOUT,
        Some(value) => parse_timeout(value).unwrap_or_else(|| {
            warn!(value = %value, "Unrecognised connectionTimeout, using default");
            DEFAULT_CONNECTION_TIMEOUT
        }),
    };

    let additional_headers = match first_present(obj, &["additionalHeaders", "headers"]) {
        Some((field, Value::Object(map))) => {
            let mut headers = HashMap::with_capacity(map.len());
            for (key, value) in map {
                let Value::String(value) = value else {
                    return Err(SchemaError::new(field, "an object of strings"));
                };
                headers.insert(key.clone(), value.clone());
            }
            headers
        }
        Some((field, _)) => return Err(SchemaError::new(field, "an object of strings")),
        None => HashMap::new(),
    };

    Ok(Some(HttpSpec {
        endpoint,
        transport_mode,
        name: optional_string(obj, "name")?,
        additional_headers,
        connection_timeout,
    }))
}

fn read_in_process(obj: &Map<String, Value>) -> InProcessSpec {
    InProcessSpec {
        class: obj.get("class").and_then(Value::as_str).map(str::to_string),
    }
}

/// First of `fields` present with a non-null value.
fn first_present<'a>(
    obj: &'a Map<String, Value>,
    fields: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    fields
        .iter()
        .find_map(|field| match obj.get(*field) {
            None | Some(Value::Null) => None,
            Some(value) => Some((*field, value)),
        })
}

fn optional_string(obj: &Map<String, Value>, field: &'static str) -> Result<Option<String>, SchemaError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::new(field, "a string")),
    }
}

fn string_list(field: &'static str, value: &Value) -> Result<Vec<String>, SchemaError> {
    let Value::Array(items) = value else {
        return Err(SchemaError::new(field, "an array of strings"));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(SchemaError::new(field, "an array of strings")),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
