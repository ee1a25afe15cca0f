//! Process settings read from the environment.
//!
//! The binary loads `.env` first (dotenvy); this module only reads variables. Every value has a
//! default, and an unparseable value falls back to it with a warning.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::callbacks::RootEntry;
use crate::domain::LogSeverity;

/// Environment variable names.
pub mod keys {
    /// Directory scanned for peer configuration files
    pub const CONFIG_DIR: &str = "MCPLINK_CONFIG_DIR";
    /// Client name announced during the MCP handshake
    pub const CLIENT_NAME: &str = "MCPLINK_CLIENT_NAME";
    /// Handshake timeout in whole seconds
    pub const INIT_TIMEOUT_SECS: &str = "MCPLINK_INIT_TIMEOUT_SECS";
    /// Minimum level requested from peers via `logging/setLevel`
    pub const LOG_LEVEL: &str = "MCPLINK_LOG_LEVEL";
    /// Roots advertised to peers: `name=uri;name=uri`
    pub const ROOTS: &str = "MCPLINK_ROOTS";
}

pub const DEFAULT_CLIENT_NAME: &str = "mcplink";
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub client_name: String,
    pub initialization_timeout: Duration,
    pub log_level: LogSeverity,
    pub roots: Vec<RootEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            initialization_timeout: DEFAULT_INIT_TIMEOUT,
            log_level: LogSeverity::Info,
            roots: Vec::new(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get(keys::CONFIG_DIR) {
            settings.config_dir = PathBuf::from(dir);
        }

        if let Some(name) = get(keys::CLIENT_NAME) {
            settings.client_name = name;
        }

        if let Some(raw) = get(keys::INIT_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.initialization_timeout = Duration::from_secs(secs),
                _ => warn!(key = keys::INIT_TIMEOUT_SECS, value = %raw, "Invalid timeout, using default"),
            }
        }

        if let Some(raw) = get(keys::LOG_LEVEL) {
            match LogSeverity::parse(&raw) {
                Some(level) => settings.log_level = level,
                None => warn!(key = keys::LOG_LEVEL, value = %raw, "Unknown log level, using default"),
            }
        }

        if let Some(raw) = get(keys::ROOTS) {
            settings.roots = parse_roots(&raw);
        }

        settings
    }
}

/// Parse `name=uri;name=uri`. A bare `uri` takes its own text as the name.
fn parse_roots(raw: &str) -> Vec<RootEntry> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (name, uri) = match part.split_once('=') {
                Some((name, uri)) => (name.trim(), uri.trim()),
                None => (part, part),
            };
            if uri.is_empty() {
                warn!(key = keys::ROOTS, entry = %part, "Root without a URI, skipping");
                return None;
            }
            Some(RootEntry::new(name, uri))
        })
        .collect()
}
