//! Client handler attached to every peer connection
//!
//! Adapts the runtime's typed requests to the handlers in [`mcplink_core::CallbackRegistry`].
//! Parameters cross the boundary through `serde_json`; a request that does not convert is handed
//! to the registry as `None`, which answers it in-band.

use mcplink_core::{CallbackRegistry, ElicitationRequest, SamplingRequest};
use rmcp::model::{
    ClientCapabilities, ClientInfo, CreateElicitationRequestParams, CreateElicitationResult,
    CreateMessageRequestParams, CreateMessageResult, Implementation, ListRootsResult,
    LoggingMessageNotificationParam,
};
use rmcp::service::{NotificationContext, RequestContext};
use rmcp::{ErrorData as McpError, RoleClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Handles server-initiated requests and notifications for one peer.
#[derive(Clone)]
pub struct PeerClientHandler {
    peer: String,
    info: ClientInfo,
    callbacks: CallbackRegistry,
}

impl std::fmt::Debug for PeerClientHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerClientHandler")
            .field("peer", &self.peer)
            .field("client", &self.info.client_info.name)
            .finish()
    }
}

impl PeerClientHandler {
    pub fn new(
        peer: &str,
        client_name: &str,
        client_version: &str,
        callbacks: CallbackRegistry,
    ) -> Self {
        Self {
            info: ClientInfo {
                protocol_version: Default::default(),
                capabilities: ClientCapabilities::builder()
                    .enable_roots()
                    .enable_roots_list_changed()
                    .enable_sampling()
                    .enable_elicitation()
                    .build(),
                client_info: Implementation {
                    name: client_name.to_string(),
                    version: client_version.to_string(),
                    ..Default::default()
                },
                meta: None,
            },
            peer: peer.to_string(),
            callbacks,
        }
    }

    pub fn peer_name(&self) -> &str {
        &self.peer
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }
}

/// Re-shape a runtime type into a domain type with the same wire form.
fn to_domain<S: Serialize, D: DeserializeOwned>(value: &S) -> Option<D> {
    let json = serde_json::to_value(value).ok()?;
    match serde_json::from_value(json) {
        Ok(domain) => Some(domain),
        Err(e) => {
            debug!(error = %e, "Request parameters do not match the expected shape");
            None
        }
    }
}

/// Inverse of [`to_domain`] for results going back to the peer.
fn to_wire<S: Serialize, D: DeserializeOwned>(value: &S) -> Result<D, McpError> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| McpError::internal_error(format!("failed to encode result: {e}"), None))
}

impl rmcp::ClientHandler for PeerClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }

    async fn create_message(
        &self,
        params: CreateMessageRequestParams,
        _context: RequestContext<RoleClient>,
    ) -> Result<CreateMessageResult, McpError> {
        debug!(peer = %self.peer, "sampling/createMessage");
        let request: Option<SamplingRequest> = to_domain(&params);
        let result = self.callbacks.sample(&self.peer, request).await;
        to_wire(&result)
    }

    async fn create_elicitation(
        &self,
        request: CreateElicitationRequestParams,
        _context: RequestContext<RoleClient>,
    ) -> Result<CreateElicitationResult, McpError> {
        debug!(peer = %self.peer, "elicitation/create");
        let request: Option<ElicitationRequest> = to_domain(&request);
        let response = self.callbacks.elicit(&self.peer, request).await;
        to_wire(&response)
    }

    async fn list_roots(
        &self,
        _context: RequestContext<RoleClient>,
    ) -> Result<ListRootsResult, McpError> {
        let roots = self.callbacks.roots(&self.peer);
        debug!(peer = %self.peer, count = roots.len(), "roots/list");
        to_wire(&serde_json::json!({ "roots": roots }))
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        match serde_json::to_value(&params) {
            Ok(payload) => {
                self.callbacks.log_notification(&self.peer, &payload);
            }
            Err(e) => warn!(peer = %self.peer, error = %e, "Could not read log notification"),
        }
    }

    async fn on_tool_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(peer = %self.peer, "Peer sent tools/list_changed");
    }

    async fn on_prompt_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(peer = %self.peer, "Peer sent prompts/list_changed");
    }

    async fn on_resource_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(peer = %self.peer, "Peer sent resources/list_changed");
    }
}
