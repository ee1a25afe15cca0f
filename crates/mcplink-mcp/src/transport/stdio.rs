//! STDIO transport for MCP servers
//!
//! The peer runs as a child process speaking MCP over stdin/stdout. The child is the server side,
//! so there is no local server task for this transport.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

#[cfg(windows)]
#[allow(unused_imports)]
use std::os::windows::process::CommandExt;

use anyhow::{Context, Result};
use mcplink_core::StdioSpec;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::handshake;
use crate::client::McpClient;
use crate::handler::PeerClientHandler;

/// Split a command that may embed its own arguments (`"docker run -i image"`) and append the
/// configured ones.
pub fn parse_command(command: &str, args: &[String]) -> Result<(String, Vec<String>)> {
    let mut parts = shell_words::split(command)
        .with_context(|| format!("Failed to parse command: {command}"))?
        .into_iter();
    let executable = parts.next().context("Command is empty")?;

    let mut all_args: Vec<String> = parts.collect();
    all_args.extend(args.iter().cloned());
    Ok((executable, all_args))
}

/// Find `executable` on PATH (also trying `.exe`). Paths that exist are used as given.
pub fn resolve_command(executable: &str) -> Result<PathBuf> {
    which::which(executable)
        .or_else(|_| which::which(format!("{executable}.exe")))
        .with_context(|| {
            format!("Command not found: {executable}. Ensure it's installed and in PATH.")
        })
}

/// Keep children out of the parent's terminal: a new process group on Unix, no console window
/// on Windows.
pub fn configure_child_process_platform(cmd: &mut Command) {
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
}

pub(crate) async fn connect(
    peer: &str,
    spec: &StdioSpec,
    handler: PeerClientHandler,
    timeout: Duration,
) -> Result<McpClient> {
    let (executable, args) = parse_command(&spec.command, &spec.args)?;
    let command_path = resolve_command(&executable).map_err(|e| {
        error!(peer, error = %e, "Cannot launch stdio peer");
        e
    })?;

    info!(
        peer,
        path = ?command_path,
        args = ?args,
        cwd = ?spec.working_directory,
        "Connecting to stdio peer"
    );

    let env = spec.environment_variables.clone();
    let working_directory = spec.working_directory.clone();
    let transport = TokioChildProcess::new(Command::new(&command_path).configure(move |cmd| {
        cmd.args(&args).stderr(Stdio::null()).kill_on_drop(true);
        for (key, value) in &env {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }
        if let Some(dir) = &working_directory {
            cmd.current_dir(dir);
        }
        configure_child_process_platform(cmd);
    }))
    .with_context(|| format!("Failed to spawn process for '{peer}': {}", command_path.display()))?;

    let client = handshake(peer, timeout, handler.serve(transport)).await?;
    debug!(peer, "stdio peer connected");
    Ok(client)
}
