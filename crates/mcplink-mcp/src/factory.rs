//! Discovers peers and starts one proxy per peer
//!
//! The in-process peer is always started first in the list, so local capabilities are available
//! even without any configuration files. Starts run concurrently and one peer's failure never
//! affects another.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use mcplink_core::{discover_configurations, PeerConfiguration, TransportKind};
use tracing::{info, warn};

use crate::client::McpClientHandle;
use crate::duplex::{DuplexChannel, DEFAULT_DUPLEX_BUFFER};
use crate::local::LocalServer;
use crate::proxy::{ClientOptions, McpProxy};
use crate::transport::{InProcessEndpoint, TransportInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryState {
    Idle,
    Discovering,
    Starting,
    Ready,
    Disposed,
}

/// Outcome of [`ProxyFactory::start_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub started: Vec<String>,
    /// Peers not started because an earlier configuration used the same name
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl StartReport {
    pub fn all_started(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

pub struct ProxyFactory {
    config_dir: PathBuf,
    local_server: LocalServer,
    duplex_buffer: usize,
    proxies: Vec<McpProxy>,
    state: FactoryState,
}

impl ProxyFactory {
    pub fn new(config_dir: impl Into<PathBuf>, local_server: LocalServer) -> Self {
        Self {
            config_dir: config_dir.into(),
            local_server,
            duplex_buffer: DEFAULT_DUPLEX_BUFFER,
            proxies: Vec::new(),
            state: FactoryState::Idle,
        }
    }

    pub fn with_duplex_buffer(mut self, buffer: usize) -> Self {
        self.duplex_buffer = buffer;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn state(&self) -> FactoryState {
        self.state
    }

    /// Discover peers and start them all.
    ///
    /// `options_factory` is called once per configuration, in order, before any start begins.
    /// Only discovery errors are returned; per-peer failures are in the report and on each
    /// proxy's error message.
    pub async fn start_all<F, Fut>(&mut self, options_factory: F) -> Result<StartReport>
    where
        F: Fn(&PeerConfiguration) -> Fut,
        Fut: Future<Output = ClientOptions>,
    {
        if self.state != FactoryState::Idle {
            bail!("proxy factory cannot start from state {:?}", self.state);
        }

        self.state = FactoryState::Discovering;
        let discovered = match discover_configurations(&self.config_dir).await {
            Ok(discovered) => discovered,
            Err(e) => {
                self.state = FactoryState::Idle;
                return Err(e).with_context(|| {
                    format!(
                        "Failed to discover peer configurations in {}",
                        self.config_dir.display()
                    )
                });
            }
        };

        let mut configurations = Vec::with_capacity(discovered.len() + 1);
        configurations.push(PeerConfiguration::in_process());
        configurations.extend(discovered);

        let mut report = StartReport::default();
        let mut seen = HashSet::new();
        let mut starts = Vec::with_capacity(configurations.len());

        self.state = FactoryState::Starting;
        for configuration in configurations {
            if !seen.insert(configuration.name.clone()) {
                warn!(peer = %configuration.name, "Duplicate peer name, skipping");
                report.skipped.push(configuration.name);
                continue;
            }

            let options = options_factory(&configuration).await;
            let inputs = match configuration.kind() {
                TransportKind::InProcess => TransportInputs::in_process(InProcessEndpoint::new(
                    DuplexChannel::new(self.duplex_buffer),
                    self.local_server.session(),
                )),
                _ => TransportInputs::none(),
            };

            starts.push(async move {
                let mut proxy = McpProxy::new();
                let result = proxy.start(&options, &configuration, inputs).await;
                (configuration.name, proxy, result)
            });
        }

        for (name, proxy, result) in join_all(starts).await {
            match result {
                Ok(true) => report.started.push(name),
                Ok(false) => report.skipped.push(name),
                Err(e) => report.failed.push((name, format!("{e:#}"))),
            }
            self.proxies.push(proxy);
        }

        self.state = FactoryState::Ready;
        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Proxy startup settled"
        );
        Ok(report)
    }

    /// Every proxy created by `start_all`, including failed ones.
    pub fn proxies(&self) -> &[McpProxy] {
        &self.proxies
    }

    /// Proxies with a connected client.
    pub fn running(&self) -> impl Iterator<Item = &McpProxy> {
        self.proxies.iter().filter(|p| p.is_running())
    }

    pub fn clients(&self) -> impl Iterator<Item = &McpClientHandle> {
        self.proxies.iter().filter_map(McpProxy::client)
    }

    pub fn proxy(&self, name: &str) -> Option<&McpProxy> {
        self.proxies.iter().find(|p| p.name() == name)
    }

    /// Dispose every proxy and drop them. Idempotent.
    pub async fn dispose(&mut self) {
        if self.state == FactoryState::Disposed {
            return;
        }
        join_all(self.proxies.iter_mut().map(|proxy| proxy.dispose())).await;
        self.proxies.clear();
        self.state = FactoryState::Disposed;
        info!("Proxy factory disposed");
    }
}
