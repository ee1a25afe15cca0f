use std::sync::Arc;

use mcplink_core::LogSeverity;
use parking_lot::RwLock;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
    Implementation, ListPromptsResult, ListToolsResult, PaginatedRequestParams, PromptsCapability,
    ServerCapabilities, ServerInfo, SetLevelRequestParams, ToolsCapability,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use tracing::{debug, info};

use super::builtin;
use super::registry::{LevelFilter, PromptRegistry, ToolContext, ToolRegistry};

pub const LOCAL_SERVER_NAME: &str = "mcplink-local";

/// MCP server for capabilities hosted in this process.
///
/// Tools and prompts are shared between sessions; the log level is per session, see
/// [`LocalServer::session`].
pub struct LocalServer {
    name: String,
    tools: Arc<ToolRegistry>,
    prompts: Arc<PromptRegistry>,
    min_level: LevelFilter,
}

impl LocalServer {
    pub fn new(name: impl Into<String>, tools: ToolRegistry, prompts: PromptRegistry) -> Self {
        Self {
            name: name.into(),
            tools: Arc::new(tools),
            prompts: Arc::new(prompts),
            min_level: Arc::new(RwLock::new(None)),
        }
    }

    /// Server with the built-in tools and prompts.
    pub fn with_defaults() -> Self {
        let mut tools = ToolRegistry::new();
        let mut prompts = PromptRegistry::new();
        builtin::register_defaults(&mut tools, &mut prompts);
        Self::new(LOCAL_SERVER_NAME, tools, prompts)
    }

    /// Same registries, fresh per-session state.
    pub fn session(&self) -> Self {
        Self {
            name: self.name.clone(),
            tools: self.tools.clone(),
            prompts: self.prompts.clone(),
            min_level: Arc::new(RwLock::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Level most recently requested by the client.
    pub fn log_level(&self) -> Option<LogSeverity> {
        *self.min_level.read()
    }
}

impl ServerHandler for LocalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                prompts: Some(PromptsCapability::default()),
                logging: Some(Default::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some("Tools and prompts hosted by the mcplink process.".to_string()),
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.tools()))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let name = params.name.to_string();
        debug!(tool = %name, "Local tool call");
        let ctx = ToolContext::new(context.peer, name.clone(), self.min_level.clone());
        self.tools
            .call(&name, ctx, params.arguments.unwrap_or_default())
            .await
    }

    async fn list_prompts(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult::with_all_items(self.prompts.prompts()))
    }

    async fn get_prompt(
        &self,
        params: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.prompts.get(&params.name, params.arguments)
    }

    async fn set_level(
        &self,
        params: SetLevelRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<(), McpError> {
        let level = serde_json::to_value(params.level)
            .ok()
            .and_then(|v| v.as_str().and_then(LogSeverity::parse))
            .ok_or_else(|| McpError::invalid_params("unsupported log level", None))?;
        info!(server = %self.name, %level, "Client set log level");
        *self.min_level.write() = Some(level);
        Ok(())
    }
}
