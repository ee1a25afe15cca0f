//! Client surface handed to the orchestrator

use anyhow::{Context, Result};
use mcplink_core::LogSeverity;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult, JsonObject,
    Prompt, Resource, ServerInfo, SetLevelRequestParams, Tool,
};
use rmcp::service::{Peer, RunningService};
use rmcp::RoleClient;
use serde_json::Value;
use tracing::debug;

use crate::handler::PeerClientHandler;

/// Type alias for a connected MCP client service
pub type McpClient = RunningService<RoleClient, PeerClientHandler>;

/// A connected client for one peer.
///
/// Listing a capability the peer does not advertise returns an empty list.
pub struct McpClientHandle {
    peer_name: String,
    service: McpClient,
}

impl std::fmt::Debug for McpClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientHandle")
            .field("peer", &self.peer_name)
            .finish_non_exhaustive()
    }
}

impl McpClientHandle {
    pub(crate) fn new(peer_name: impl Into<String>, service: McpClient) -> Self {
        Self {
            peer_name: peer_name.into(),
            service,
        }
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    /// The underlying request sender.
    pub fn peer(&self) -> &Peer<RoleClient> {
        self.service.peer()
    }

    /// What the peer announced during the handshake.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.service.peer_info().cloned()
    }

    fn advertises(&self, check: impl Fn(&ServerInfo) -> bool) -> bool {
        self.service.peer_info().map(check).unwrap_or(false)
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        if !self.advertises(|info| info.capabilities.tools.is_some()) {
            return Ok(Vec::new());
        }
        self.service
            .list_all_tools()
            .await
            .with_context(|| format!("Failed to list tools of '{}'", self.peer_name))
    }

    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        if !self.advertises(|info| info.capabilities.prompts.is_some()) {
            return Ok(Vec::new());
        }
        self.service
            .list_all_prompts()
            .await
            .with_context(|| format!("Failed to list prompts of '{}'", self.peer_name))
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        if !self.advertises(|info| info.capabilities.resources.is_some()) {
            return Ok(Vec::new());
        }
        self.service
            .list_all_resources()
            .await
            .with_context(|| format!("Failed to list resources of '{}'", self.peer_name))
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<GetPromptResult> {
        let params: GetPromptRequestParams =
            serde_json::from_value(serde_json::json!({ "name": name, "arguments": arguments }))
                .context("Failed to build prompt request")?;
        self.service
            .get_prompt(params)
            .await
            .with_context(|| format!("Failed to get prompt '{}' from '{}'", name, self.peer_name))
    }

    /// Ask the peer to only send log notifications at `level` or above.
    ///
    /// A peer without the logging capability is left alone.
    pub async fn set_logging_level(&self, level: LogSeverity) -> Result<()> {
        if !self.advertises(|info| info.capabilities.logging.is_some()) {
            debug!(peer = %self.peer_name, "Peer does not support logging, skipping setLevel");
            return Ok(());
        }
        let params: SetLevelRequestParams =
            serde_json::from_value(serde_json::json!({ "level": level.as_str() }))
                .context("Failed to build setLevel request")?;
        self.service
            .set_level(params)
            .await
            .with_context(|| format!("Failed to set log level on '{}'", self.peer_name))
    }

    /// Invoke a tool. Tool-level failures come back as `is_error` results, not `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        debug!(peer = %self.peer_name, tool = %name, "Calling tool");

        let arguments = arguments.and_then(|v| v.as_object().cloned());
        self.service
            .call_tool(CallToolRequestParams {
                name: name.to_string().into(),
                arguments,
                task: None,
                meta: None,
            })
            .await
            .with_context(|| format!("Tool call '{}' on '{}' failed", name, self.peer_name))
    }

    /// Close the session. For stdio peers this also ends the child process.
    pub async fn cancel(self) -> Result<()> {
        self.service
            .cancel()
            .await
            .with_context(|| format!("Failed to cancel client of '{}'", self.peer_name))?;
        Ok(())
    }
}
