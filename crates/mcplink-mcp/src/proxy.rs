//! One MCP peer behind a client-only interface
//!
//! A proxy is started at most once. For in-process peers it also owns the task serving the
//! local server on the other end of the duplex channel; that task runs detached and reports
//! through a watch channel instead of being awaited.

use std::time::Duration;

use anyhow::Result;
use mcplink_core::{
    CallbackRegistry, LogSeverity, PeerConfiguration, TransportKind, DEFAULT_SHUTDOWN_TIMEOUT,
};
use rmcp::ServiceExt;
use tokio::io::DuplexStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::client::McpClientHandle;
use crate::handler::PeerClientHandler;
use crate::local::LocalServer;
use crate::transport::{
    connect_http, connect_stdio, handshake, select_transport, ResolvedTransport, TransportInputs,
};

/// Upper bound on waiting for the local server task after it was cancelled.
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Contract violations and timeouts reported by [`McpProxy::start`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("peer '{peer}' uses the in-process transport but no endpoint was supplied")]
    MissingInProcessEndpoint { peer: String },

    #[error("handshake with '{peer}' timed out after {timeout:?}")]
    HandshakeTimeout { peer: String, timeout: Duration },

    #[error("proxy '{peer}' has been disposed")]
    AlreadyDisposed { peer: String },

    #[error("proxy '{peer}' is not running")]
    NotRunning { peer: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Created,
    Starting,
    Running,
    Failed,
    Disposed,
}

/// Status of the local server task. Only in-process proxies run one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    NotStarted,
    Running,
    Stopped,
    Failed(String),
}

/// Per-client settings, produced once per peer by the factory's options callback.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub client_name: String,
    pub client_version: String,
    pub callbacks: CallbackRegistry,
    pub initialization_timeout: Duration,
    /// Level requested with `logging/setLevel` after the handshake
    pub log_level: Option<LogSeverity>,
}

impl ClientOptions {
    pub fn new(callbacks: CallbackRegistry) -> Self {
        Self {
            client_name: "mcplink".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            callbacks,
            initialization_timeout: DEFAULT_INITIALIZATION_TIMEOUT,
            log_level: None,
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_initialization_timeout(mut self, timeout: Duration) -> Self {
        self.initialization_timeout = timeout;
        self
    }

    pub fn with_log_level(mut self, level: LogSeverity) -> Self {
        self.log_level = Some(level);
        self
    }

    fn handler_for(&self, peer: &str) -> PeerClientHandler {
        PeerClientHandler::new(
            peer,
            &self.client_name,
            &self.client_version,
            self.callbacks.clone(),
        )
    }
}

/// Detached task serving a [`LocalServer`] on one end of a duplex channel.
struct ServerTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _guard: DropGuard,
}

impl ServerTask {
    fn spawn(
        peer: String,
        server: LocalServer,
        stream: DuplexStream,
        status: watch::Sender<ServerStatus>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let running = tokio::select! {
                _ = task_cancel.cancelled() => {
                    status.send_replace(ServerStatus::Stopped);
                    return;
                }
                result = server.serve_with_ct(stream, task_cancel.child_token()) => result,
            };

            let running = match running {
                Ok(running) => running,
                Err(e) => {
                    error!(peer = %peer, error = %e, "Local server failed to initialize");
                    status.send_replace(ServerStatus::Failed(e.to_string()));
                    return;
                }
            };

            status.send_replace(ServerStatus::Running);
            debug!(peer = %peer, "Local server running");

            match running.waiting().await {
                Ok(reason) => {
                    debug!(peer = %peer, ?reason, "Local server stopped");
                    status.send_replace(ServerStatus::Stopped);
                }
                Err(e) => {
                    error!(peer = %peer, error = %e, "Local server task aborted");
                    status.send_replace(ServerStatus::Failed(e.to_string()));
                }
            }
        });

        Self {
            _guard: cancel.clone().drop_guard(),
            cancel,
            handle,
        }
    }

    async fn stop(self, peer: &str) {
        self.cancel.cancel();
        match tokio::time::timeout(SERVER_STOP_TIMEOUT, self.handle).await {
            Ok(Ok(())) => debug!(peer, "Local server task finished"),
            Ok(Err(e)) => warn!(peer, error = %e, "Local server task panicked"),
            Err(_) => warn!(peer, "Local server task did not stop in time"),
        }
    }
}

/// One peer: a client handle plus whatever it needs to stay connected.
pub struct McpProxy {
    name: String,
    error_message: Option<String>,
    state: ProxyState,
    kind: Option<TransportKind>,
    client: Option<McpClientHandle>,
    shutdown_timeout: Duration,
    server: Option<ServerTask>,
    status_tx: Option<watch::Sender<ServerStatus>>,
    status_rx: watch::Receiver<ServerStatus>,
}

impl Default for McpProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for McpProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpProxy")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}

impl McpProxy {
    pub fn new() -> Self {
        let (status_tx, status_rx) = watch::channel(ServerStatus::NotStarted);
        Self {
            name: String::new(),
            error_message: None,
            state: ProxyState::Created,
            kind: None,
            client: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            server: None,
            status_tx: Some(status_tx),
            status_rx,
        }
    }

    /// Peer name; empty until `start` is called.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.kind
    }

    pub fn client(&self) -> Option<&McpClientHandle> {
        self.client.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.client.is_some()
    }

    /// Watch the local server task. Stays `NotStarted` for stdio and HTTP peers.
    pub fn server_status(&self) -> watch::Receiver<ServerStatus> {
        self.status_rx.clone()
    }

    /// Connect to the peer described by `configuration`.
    ///
    /// Returns `Ok(false)` without doing anything if this proxy was already started. Transport and
    /// handshake failures are returned as errors and also kept in [`error_message`](Self::error_message).
    pub async fn start(
        &mut self,
        options: &ClientOptions,
        configuration: &PeerConfiguration,
        inputs: TransportInputs,
    ) -> Result<bool> {
        match self.state {
            ProxyState::Created => {}
            ProxyState::Disposed => {
                debug!(peer = %configuration.name, "Ignoring start on a disposed proxy");
                return Ok(false);
            }
            state => {
                debug!(peer = %self.name, ?state, "Proxy already started");
                return Ok(false);
            }
        }

        self.name = configuration.name.clone();
        let transport = match select_transport(configuration, inputs) {
            Ok(transport) => transport,
            Err(e) => {
                self.fail(&e);
                return Err(e.into());
            }
        };

        self.state = ProxyState::Starting;
        self.kind = Some(transport.kind());
        info!(
            peer = %self.name,
            transport = %configuration.transport.description(),
            "Starting proxy"
        );

        let handler = options.handler_for(&self.name);
        let timeout = options.initialization_timeout;
        let connected = match transport {
            ResolvedTransport::Stdio(spec) => {
                self.shutdown_timeout = spec.shutdown_timeout;
                connect_stdio(&self.name, &spec, handler, timeout).await
            }
            ResolvedTransport::Http(spec) => connect_http(&self.name, &spec, handler, timeout).await,
            ResolvedTransport::InProcess(endpoint) => {
                let (client_end, server_end) = endpoint.channel.into_parts();
                if let Some(status) = self.status_tx.take() {
                    self.server = Some(ServerTask::spawn(
                        self.name.clone(),
                        endpoint.server,
                        server_end,
                        status,
                    ));
                }
                handshake(&self.name, timeout, handler.serve(client_end)).await
            }
        };

        let service = match connected {
            Ok(service) => service,
            Err(e) => {
                self.fail(&e);
                if let Some(server) = self.server.take() {
                    server.stop(&self.name).await;
                }
                return Err(e);
            }
        };

        let client = McpClientHandle::new(self.name.clone(), service);
        if let Some(level) = options.log_level {
            if let Err(e) = client.set_logging_level(level).await {
                warn!(peer = %self.name, error = %e, "Failed to negotiate log level");
            }
        }

        self.client = Some(client);
        self.error_message = None;
        self.state = ProxyState::Running;
        info!(peer = %self.name, "Proxy running");
        Ok(true)
    }

    fn fail(&mut self, err: &dyn std::fmt::Display) {
        let message = format!("{}: {err:#}", self.name);
        error!(peer = %self.name, error = %err, "Proxy failed to start");
        self.error_message = Some(message);
        self.state = ProxyState::Failed;
    }

    /// Tear down the client, then the local server. Safe to call repeatedly or after a failed
    /// start.
    pub async fn dispose(&mut self) {
        if self.state == ProxyState::Disposed {
            return;
        }

        if let Some(client) = self.client.take() {
            match tokio::time::timeout(self.shutdown_timeout, client.cancel()).await {
                Ok(Ok(())) => debug!(peer = %self.name, "Client closed"),
                Ok(Err(e)) => warn!(peer = %self.name, error = %e, "Error closing client"),
                Err(_) => warn!(
                    peer = %self.name,
                    timeout = ?self.shutdown_timeout,
                    "Client did not close in time"
                ),
            }
        }

        if let Some(server) = self.server.take() {
            server.stop(&self.name).await;
        }

        self.state = ProxyState::Disposed;
        debug!(peer = %self.name, "Proxy disposed");
    }

    /// The client, or why there is none.
    pub fn require_client(&self) -> std::result::Result<&McpClientHandle, ProxyError> {
        let peer = self.name.clone();
        match (&self.client, self.state) {
            (Some(client), _) => Ok(client),
            (None, ProxyState::Disposed) => Err(ProxyError::AlreadyDisposed { peer }),
            (None, _) => Err(ProxyError::NotRunning { peer }),
        }
    }
}
