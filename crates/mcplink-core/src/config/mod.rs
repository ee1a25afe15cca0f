//! Peer configuration files and process settings

mod discovery;
mod error;
mod schema;
mod settings;

pub use discovery::{discover_configurations, parse_configuration_document};
pub use error::{ConfigError, SchemaError};
pub use schema::detect_transport;
pub use settings::{keys, Settings};
