//! Domain entities

pub mod log;
pub mod peer;
pub mod timeout;

pub use log::{LogBucket, LogSeverity};
pub use peer::{
    HttpSpec, HttpTransportMode, InProcessSpec, PeerConfiguration, PeerTransport, StdioSpec,
    TransportKind, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT, IN_PROCESS_PEER_NAME,
};
pub use timeout::parse_timeout;
