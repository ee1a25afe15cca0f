//! HTTP transport for MCP servers
//!
//! Both transport modes connect over Streamable HTTP; the runtime has no legacy SSE client, so
//! auto-detect resolves to it as well.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use mcplink_core::{HttpSpec, HttpTransportMode};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use tracing::{debug, info};

use super::handshake;
use crate::client::McpClient;
use crate::handler::PeerClientHandler;

/// Build a reqwest HeaderMap from configured headers.
pub fn build_default_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid header name '{key}'"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid header value for '{key}'"))?;
        header_map.insert(name, value);
    }
    Ok(header_map)
}

/// Build a reqwest::Client with the configured headers sent on every request.
pub fn build_http_client(headers: HeaderMap, connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) async fn connect(
    peer: &str,
    spec: &HttpSpec,
    handler: PeerClientHandler,
    timeout: Duration,
) -> Result<McpClient> {
    info!(
        peer,
        url = %spec.endpoint,
        headers = spec.additional_headers.len(),
        "Connecting to HTTP peer"
    );
    if spec.transport_mode == HttpTransportMode::AutoDetect {
        debug!(peer, "Auto-detect transport mode, using Streamable HTTP");
    }

    let headers = build_default_headers(&spec.additional_headers)?;
    let client = build_http_client(headers, spec.connection_timeout)?;

    let config = StreamableHttpClientTransportConfig::with_uri(spec.endpoint.as_str());
    let transport = StreamableHttpClientTransport::with_client(client, config);

    let client = handshake(peer, timeout, handler.serve(transport)).await?;
    debug!(peer, "HTTP peer connected");
    Ok(client)
}
