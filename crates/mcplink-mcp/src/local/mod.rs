//! Capabilities hosted in this process
//!
//! Served to the always-present in-process peer over a duplex channel.

pub mod builtin;
mod registry;
mod server;

pub use registry::{LevelFilter, PromptArgumentSpec, PromptRegistry, ToolContext, ToolRegistry};
pub use server::{LocalServer, LOCAL_SERVER_NAME};
