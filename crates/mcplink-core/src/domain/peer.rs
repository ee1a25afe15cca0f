//! Peer configuration
//!
//! A peer is one MCP server reachable through its own proxy. The transport descriptors are
//! mutually exclusive, so they are modelled as a single enum rather than three optional fields.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the synthetic peer that hosts local capabilities.
pub const IN_PROCESS_PEER_NAME: &str = "InProcessMcpServer";

/// Default time a child process gets to exit after its client is cancelled.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout for HTTP peers.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport discriminant, used for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Stdio,
    Http,
    InProcess,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::InProcess => "in_process",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to launch a peer as a child process speaking MCP over stdin/stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct StdioSpec {
    /// Executable, possibly with embedded arguments (`"npx -y server"`)
    pub command: String,
    pub args: Vec<String>,
    /// Display name from the file, if any (the map key is the peer name)
    pub name: Option<String>,
    pub working_directory: Option<String>,
    /// Overrides applied on top of the inherited environment; `None` removes the variable
    pub environment_variables: HashMap<String, Option<String>>,
    pub shutdown_timeout: Duration,
}

impl StdioSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            name: None,
            working_directory: None,
            environment_variables: HashMap::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Whether the HTTP transport may negotiate or must use Streamable HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpTransportMode {
    #[default]
    AutoDetect,
    StreamableHttp,
}

/// How to reach a remote peer over HTTP.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSpec {
    /// Always absolute; relative URIs never make it past parsing
    pub endpoint: Url,
    pub transport_mode: HttpTransportMode,
    pub name: Option<String>,
    pub additional_headers: HashMap<String, String>,
    pub connection_timeout: Duration,
}

impl HttpSpec {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            transport_mode: HttpTransportMode::AutoDetect,
            name: None,
            additional_headers: HashMap::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Marker for a peer hosted in this process.
///
/// The byte streams are handed to the proxy when it starts; they are never part of configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InProcessSpec {
    /// Optional hint naming the local server implementation
    pub class: Option<String>,
}

/// Exactly one way of reaching a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerTransport {
    Stdio(StdioSpec),
    Http(HttpSpec),
    InProcess(InProcessSpec),
}

impl PeerTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Http(_) => TransportKind::Http,
            Self::InProcess(_) => TransportKind::InProcess,
        }
    }

    /// Short description for logs (`stdio:npx`, `http:https://...`, `in_process`)
    pub fn description(&self) -> String {
        match self {
            Self::Stdio(spec) => format!("stdio:{}", spec.command),
            Self::Http(spec) => format!("http:{}", spec.endpoint),
            Self::InProcess(_) => "in_process".to_string(),
        }
    }
}

/// Configuration for one MCP peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerConfiguration {
    pub name: String,
    pub transport: PeerTransport,
}

impl PeerConfiguration {
    pub fn new(name: impl Into<String>, transport: PeerTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    pub fn stdio(name: impl Into<String>, spec: StdioSpec) -> Self {
        Self::new(name, PeerTransport::Stdio(spec))
    }

    pub fn http(name: impl Into<String>, spec: HttpSpec) -> Self {
        Self::new(name, PeerTransport::Http(spec))
    }

    /// The always-present local peer.
    pub fn in_process() -> Self {
        Self::new(
            IN_PROCESS_PEER_NAME,
            PeerTransport::InProcess(InProcessSpec::default()),
        )
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn stdio_spec(&self) -> Option<&StdioSpec> {
        match &self.transport {
            PeerTransport::Stdio(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn http_spec(&self) -> Option<&HttpSpec> {
        match &self.transport {
            PeerTransport::Http(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn in_process_spec(&self) -> Option<&InProcessSpec> {
        match &self.transport {
            PeerTransport::InProcess(spec) => Some(spec),
            _ => None,
        }
    }
}
