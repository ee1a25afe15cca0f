//! # mcplink MCP layer
//!
//! Binds MCP peers (in-process, child process over stdio, or remote over HTTP) behind one
//! client-only interface.
//!
//! - [`McpProxy`] owns one peer connection and its lifecycle
//! - [`ProxyFactory`] discovers peers and starts a proxy for each
//! - [`PeerClientHandler`] routes peer callbacks to [`mcplink_core::CallbackRegistry`]
//! - [`LocalServer`] hosts the in-process tools and prompts

pub mod client;
pub mod duplex;
pub mod factory;
pub mod handler;
pub mod local;
pub mod proxy;
pub mod transport;

pub use client::{McpClient, McpClientHandle};
pub use duplex::{DuplexChannel, DEFAULT_DUPLEX_BUFFER};
pub use factory::{FactoryState, ProxyFactory, StartReport};
pub use handler::PeerClientHandler;
pub use local::{LocalServer, PromptRegistry, ToolContext, ToolRegistry};
pub use proxy::{ClientOptions, McpProxy, ProxyError, ProxyState, ServerStatus};
pub use transport::{select_transport, InProcessEndpoint, ResolvedTransport, TransportInputs};
