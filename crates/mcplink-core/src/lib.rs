//! # mcplink core
//!
//! Runtime-agnostic pieces of the MCP proxy layer.
//!
//! ## Modules
//!
//! - `domain` - Peer configuration model and log severities
//! - `config` - JSON schema detection, directory discovery and settings
//! - `callbacks` - Sampling, elicitation, logging and roots handlers shared by every client
//!
//! Nothing here talks to the MCP runtime directly; `mcplink-mcp` adapts these types to it.

pub mod callbacks;
pub mod config;
pub mod domain;

pub use callbacks::{
    CallbackRegistry, ChatCompletion, ChatContent, ChatMessage, ChatOptions, ChatResponse,
    ChatRole, ConsoleUserPrompt, ElicitationAction, ElicitationRequest, ElicitationResponse,
    FinishReason, MemoryLogSink, PeerLogRecord, PeerLogSink, RootEntry, SamplingMessage, SamplingRequest,
    SamplingResult, StopReason, TracingLogSink, UnavailableCompletion, UserPrompt,
};
pub use config::{
    detect_transport, discover_configurations, parse_configuration_document, ConfigError,
    Settings,
};
pub use domain::*;
