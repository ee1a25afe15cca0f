//! Transport selection and connection
//!
//! A configuration resolves to exactly one transport, checked in a fixed order: stdio, then HTTP,
//! then in-process. In-process peers also need the byte streams and the server that will answer
//! on them; those are supplied by the caller at start time.

mod http;
mod stdio;

use std::future::Future;
use std::time::Duration;

use mcplink_core::{HttpSpec, PeerConfiguration, PeerTransport, StdioSpec, TransportKind};
use tracing::error;

pub use http::{build_default_headers, build_http_client};
pub use stdio::{configure_child_process_platform, parse_command, resolve_command};

pub(crate) use http::connect as connect_http;
pub(crate) use stdio::connect as connect_stdio;

use crate::client::McpClient;
use crate::duplex::DuplexChannel;
use crate::local::LocalServer;
use crate::proxy::ProxyError;

/// The server half of an in-process peer.
pub struct InProcessEndpoint {
    pub channel: DuplexChannel,
    pub server: LocalServer,
}

impl InProcessEndpoint {
    pub fn new(channel: DuplexChannel, server: LocalServer) -> Self {
        Self { channel, server }
    }
}

impl std::fmt::Debug for InProcessEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessEndpoint")
            .field("server", &self.server.name())
            .finish_non_exhaustive()
    }
}

/// Inputs that are not part of configuration.
#[derive(Debug, Default)]
pub struct TransportInputs {
    pub in_process: Option<InProcessEndpoint>,
}

impl TransportInputs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn in_process(endpoint: InProcessEndpoint) -> Self {
        Self {
            in_process: Some(endpoint),
        }
    }
}

/// A transport ready to connect.
#[derive(Debug)]
pub enum ResolvedTransport {
    Stdio(StdioSpec),
    Http(HttpSpec),
    InProcess(InProcessEndpoint),
}

impl ResolvedTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Http(_) => TransportKind::Http,
            Self::InProcess(_) => TransportKind::InProcess,
        }
    }
}

/// Pick the transport for `configuration`.
///
/// Inputs the chosen transport does not need are dropped.
pub fn select_transport(
    configuration: &PeerConfiguration,
    inputs: TransportInputs,
) -> Result<ResolvedTransport, ProxyError> {
    match &configuration.transport {
        PeerTransport::Stdio(spec) => Ok(ResolvedTransport::Stdio(spec.clone())),
        PeerTransport::Http(spec) => Ok(ResolvedTransport::Http(spec.clone())),
        PeerTransport::InProcess(_) => inputs
            .in_process
            .map(ResolvedTransport::InProcess)
            .ok_or_else(|| ProxyError::MissingInProcessEndpoint {
                peer: configuration.name.clone(),
            }),
    }
}

/// Await a client handshake, bounded by `timeout`.
pub(crate) async fn handshake<F, E>(peer: &str, timeout: Duration, serve: F) -> anyhow::Result<McpClient>
where
    F: Future<Output = Result<McpClient, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(timeout, serve).await {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(e)) => {
            error!(peer, error = %e, "MCP handshake failed");
            Err(anyhow::Error::new(e).context(format!("MCP handshake with '{peer}' failed")))
        }
        Err(_) => {
            error!(peer, ?timeout, "MCP handshake timed out");
            Err(ProxyError::HandshakeTimeout {
                peer: peer.to_string(),
                timeout,
            }
            .into())
        }
    }
}
