//! Client-side callback handlers
//!
//! Peers call back into the client for sampling, elicitation and roots, and push log
//! notifications. The handlers here work on plain serde types; `mcplink-mcp` converts the runtime's
//! parameter types at the boundary. None of them return errors: every failure is reported to the
//! calling peer in-band.

mod chat;
mod elicitation;
mod logging;
mod prompt;
mod registry;
mod roots;
mod sampling;

pub use chat::{
    ChatCompletion, ChatContent, ChatMessage, ChatOptions, ChatResponse, ChatRole, FinishReason,
    UnavailableCompletion,
};
pub use elicitation::{ElicitationAction, ElicitationRequest, ElicitationResponse};
pub use logging::{MemoryLogSink, PeerLogRecord, PeerLogSink, TracingLogSink};
pub use prompt::{ConsoleUserPrompt, UserPrompt};
pub use registry::CallbackRegistry;
pub use roots::RootEntry;
pub use sampling::{SamplingMessage, SamplingRequest, SamplingResult, StopReason};
