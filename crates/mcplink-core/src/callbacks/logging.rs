//! Peer log notifications
//!
//! Peers send `notifications/message` with `{level, logger, data}`. Records are attributed to the
//! peer that sent them and handed to a [`PeerLogSink`]; there is no shared console state.

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::domain::{LogBucket, LogSeverity};

#[derive(Debug, Clone, PartialEq)]
pub struct PeerLogRecord {
    pub peer: String,
    pub severity: LogSeverity,
    pub logger: Option<String>,
    pub data: Value,
}

impl PeerLogRecord {
    pub fn bucket(&self) -> LogBucket {
        self.severity.bucket()
    }
}

pub trait PeerLogSink: Send + Sync {
    fn record(&self, record: &PeerLogRecord);
}

/// Forwards peer logs to `tracing` at the bucket's level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl PeerLogSink for TracingLogSink {
    fn record(&self, r: &PeerLogRecord) {
        let logger = r.logger.as_deref().unwrap_or("");
        match r.bucket() {
            LogBucket::Debug => debug!(peer = %r.peer, logger, level = %r.severity, data = %r.data, "Peer log"),
            LogBucket::Info => info!(peer = %r.peer, logger, level = %r.severity, data = %r.data, "Peer log"),
            LogBucket::Warning => warn!(peer = %r.peer, logger, level = %r.severity, data = %r.data, "Peer log"),
            LogBucket::Error => error!(peer = %r.peer, logger, level = %r.severity, data = %r.data, "Peer log"),
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<PeerLogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PeerLogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl PeerLogSink for MemoryLogSink {
    fn record(&self, record: &PeerLogRecord) {
        self.records.lock().push(record.clone());
    }
}

#[derive(Deserialize)]
struct LogPayload {
    level: LogSeverity,
    #[serde(default)]
    logger: Option<String>,
    #[serde(default)]
    data: Value,
}

pub(crate) fn log_notification(
    sink: &dyn PeerLogSink,
    peer: &str,
    payload: &Value,
) -> Option<LogBucket> {
    let parsed = match LogPayload::deserialize(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(peer, payload = %payload, error = %e, "Unparseable log notification");
            return None;
        }
    };

    let record = PeerLogRecord {
        peer: peer.to_string(),
        severity: parsed.level,
        logger: parsed.logger,
        data: parsed.data,
    };
    sink.record(&record);
    Some(record.bucket())
}
