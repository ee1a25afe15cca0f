//! In-memory full-duplex link for in-process peers

use tokio::io::DuplexStream;

/// Per-direction buffer used when the caller does not pick one.
pub const DEFAULT_DUPLEX_BUFFER: usize = 64 * 1024;

/// Two connected byte streams: whatever is written to one end is read from the other.
///
/// Each in-process proxy gets its own channel; channels are never shared.
#[derive(Debug)]
pub struct DuplexChannel {
    client: DuplexStream,
    server: DuplexStream,
}

impl DuplexChannel {
    pub fn new(buffer: usize) -> Self {
        let (client, server) = tokio::io::duplex(buffer);
        Self { client, server }
    }

    /// Split into `(client_end, server_end)`.
    pub fn into_parts(self) -> (DuplexStream, DuplexStream) {
        (self.client, self.server)
    }
}

impl Default for DuplexChannel {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLEX_BUFFER)
    }
}
