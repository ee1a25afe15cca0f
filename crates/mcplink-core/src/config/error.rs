//! Configuration errors

use std::path::PathBuf;

/// A peer entry that looked like a known transport but carried a field of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}' must be {expected}")]
pub struct SchemaError {
    pub field: &'static str,
    pub expected: &'static str,
}

impl SchemaError {
    pub fn new(field: &'static str, expected: &'static str) -> Self {
        Self { field, expected }
    }
}

/// Errors that abort configuration discovery.
///
/// A peer entry matching no known schema is not an error; it is skipped with a warning.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{key}' in {origin} must be an object mapping peer names to transports")]
    InvalidServers { origin: String, key: &'static str },

    #[error("peer '{peer}' in {origin}: {source}")]
    InvalidEntry {
        origin: String,
        peer: String,
        #[source]
        source: SchemaError,
    },
}
