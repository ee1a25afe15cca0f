//! Discovery of peer configurations from a directory of JSON files.
//!
//! Each file holds a `servers` (or `mcpServers`) object mapping peer names to transport specs.
//! Corrupt JSON aborts the whole discovery; entries that match no schema are skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::error::ConfigError;
use super::schema::detect_transport;
use crate::domain::PeerConfiguration;

/// Keys that may hold the peer map, in lookup order.
const SERVER_KEYS: [&str; 2] = ["servers", "mcpServers"];

/// Scan `dir` (non-recursively) for `*.json` files and collect every peer they describe.
///
/// Files are read in file-name order so the result is stable across platforms.
/// A missing directory yields an empty list.
pub async fn discover_configurations(
    dir: impl AsRef<Path>,
) -> Result<Vec<PeerConfiguration>, ConfigError> {
    let dir = dir.as_ref();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "Configuration directory does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files: Vec<PathBuf> = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut configurations = Vec::new();
    for path in files {
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

        let document: Value = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(source) => {
                error!(path = %path.display(), error = %source, "Malformed configuration file");
                return Err(ConfigError::Json { path, source });
            }
        };

        let origin = path.display().to_string();
        let found = parse_configuration_document(&origin, &document)?;
        debug!(path = %origin, peers = found.len(), "Parsed configuration file");
        configurations.extend(found);
    }

    info!(
        dir = %dir.display(),
        peers = configurations.len(),
        "Discovered peer configurations"
    );
    Ok(configurations)
}

/// Extract the peers described by one parsed configuration document.
///
/// `origin` names the document in logs and errors (usually its path).
pub fn parse_configuration_document(
    origin: &str,
    document: &Value,
) -> Result<Vec<PeerConfiguration>, ConfigError> {
    let Some((key, servers)) = SERVER_KEYS
        .iter()
        .find_map(|key| document.get(*key).map(|value| (*key, value)))
    else {
        warn!(origin, "No 'servers' or 'mcpServers' key, skipping");
        return Ok(Vec::new());
    };

    let Value::Object(servers) = servers else {
        return Err(ConfigError::InvalidServers {
            origin: origin.to_string(),
            key,
        });
    };

    let mut configurations = Vec::with_capacity(servers.len());
    for (name, entry) in servers {
        match detect_transport(entry) {
            Ok(Some(transport)) => {
                debug!(origin, peer = %name, transport = %transport.description(), "Detected peer");
                configurations.push(PeerConfiguration::new(name.clone(), transport));
            }
            Ok(None) => {
                warn!(origin, peer = %name, "Peer entry matches no known transport, skipping");
            }
            Err(source) => {
                error!(origin, peer = %name, error = %source, "Invalid peer entry");
                return Err(ConfigError::InvalidEntry {
                    origin: origin.to_string(),
                    peer: name.clone(),
                    source,
                });
            }
        }
    }

    Ok(configurations)
}
