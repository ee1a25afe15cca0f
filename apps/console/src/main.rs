//! `mcplink` - start every configured MCP peer, then list what they offer or call one tool.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mcplink_core::{
    CallbackRegistry, ConsoleUserPrompt, LogSeverity, Settings, TracingLogSink,
    UnavailableCompletion,
};
use mcplink_mcp::{ClientOptions, LocalServer, ProxyFactory};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mcplink", version, about = "MCP proxy console")]
struct Cli {
    /// Directory holding peer configuration files (overrides MCPLINK_CONFIG_DIR)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log level requested from peers (overrides MCPLINK_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tools and prompts of every running peer
    Inventory,
    /// Call a tool by name
    Call {
        tool: String,
        /// Tool arguments as a JSON object
        args: Option<String>,
        /// Only look for the tool on this peer
        #[arg(long)]
        peer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let _guard = match logging::init_tracing() {
        Ok(guard) => Some(guard),
        Err(e) => {
            if let Err(console) = logging::init_console_tracing() {
                eprintln!("Warning: logging disabled: {console:#}");
            }
            warn!("File logging disabled: {e:#}");
            None
        }
    };

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::from_env();
    if let Some(dir) = cli.config_dir {
        settings.config_dir = dir;
    }
    if let Some(raw) = cli.log_level.as_deref() {
        settings.log_level =
            LogSeverity::parse(raw).with_context(|| format!("Unknown log level '{raw}'"))?;
    }

    let callbacks = CallbackRegistry::new(
        Arc::new(UnavailableCompletion),
        Arc::new(ConsoleUserPrompt::new()),
    )
    .with_log_sink(Arc::new(TracingLogSink))
    .with_roots(settings.roots.clone());

    let mut factory = ProxyFactory::new(&settings.config_dir, LocalServer::with_defaults());
    let report = factory
        .start_all(|configuration| {
            let options = ClientOptions::new(callbacks.clone())
                .with_client_name(settings.client_name.clone())
                .with_initialization_timeout(settings.initialization_timeout)
                .with_log_level(settings.log_level);
            info!(peer = %configuration.name, kind = %configuration.kind(), "Preparing peer");
            async move { options }
        })
        .await?;

    for (peer, reason) in &report.failed {
        warn!(peer = %peer, "Peer unavailable: {reason}");
    }

    let outcome = match cli.command {
        Command::Inventory => inventory(&factory).await,
        Command::Call { tool, args, peer } => {
            call(&factory, &tool, args.as_deref(), peer.as_deref()).await
        }
    };

    factory.dispose().await;
    outcome
}

async fn inventory(factory: &ProxyFactory) -> Result<ExitCode> {
    for proxy in factory.proxies() {
        let Some(client) = proxy.client() else {
            println!(
                "{} (unavailable: {})",
                proxy.name(),
                proxy.error_message().unwrap_or("not started")
            );
            continue;
        };

        println!("{}", proxy.name());
        for tool in client.list_tools().await? {
            println!(
                "  tool   {:<20} {}",
                tool.name,
                tool.description.as_deref().unwrap_or_default()
            );
        }
        for prompt in client.list_prompts().await? {
            println!(
                "  prompt {:<20} {}",
                prompt.name,
                prompt.description.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn call(
    factory: &ProxyFactory,
    tool: &str,
    args: Option<&str>,
    peer: Option<&str>,
) -> Result<ExitCode> {
    let arguments = match args {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("Tool arguments must be JSON")?;
            if !value.is_object() {
                bail!("Tool arguments must be a JSON object");
            }
            Some(value)
        }
        None => None,
    };

    for client in factory.clients() {
        if peer.is_some_and(|p| p != client.peer_name()) {
            continue;
        }
        let tools = client.list_tools().await?;
        if !tools.iter().any(|t| t.name == tool) {
            continue;
        }

        let result = client.call_tool(tool, arguments).await?;
        let blocks = serde_json::to_value(&result.content)?;
        for block in blocks.as_array().into_iter().flatten() {
            match block.get("text").and_then(Value::as_str) {
                Some(text) => println!("{text}"),
                None => println!("{block}"),
            }
        }
        return Ok(if result.is_error == Some(true) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    bail!("No running peer offers tool '{tool}'")
}
