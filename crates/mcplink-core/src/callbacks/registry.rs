use std::sync::Arc;

use serde_json::Value;

use super::chat::ChatCompletion;
use super::elicitation::{self, ElicitationRequest, ElicitationResponse};
use super::logging::{self, PeerLogSink, TracingLogSink};
use super::prompt::UserPrompt;
use super::roots::RootEntry;
use super::sampling::{self, SamplingRequest, SamplingResult};
use crate::domain::LogBucket;

/// The four handlers attached to every client.
///
/// Cheap to clone; every clone shares the same collaborators. The peer name passed to each
/// handler is only used for attribution.
#[derive(Clone)]
pub struct CallbackRegistry {
    completion: Arc<dyn ChatCompletion>,
    prompt: Arc<dyn UserPrompt>,
    log_sink: Arc<dyn PeerLogSink>,
    roots: Arc<[RootEntry]>,
}

impl CallbackRegistry {
    pub fn new(completion: Arc<dyn ChatCompletion>, prompt: Arc<dyn UserPrompt>) -> Self {
        Self {
            completion,
            prompt,
            log_sink: Arc::new(TracingLogSink),
            roots: Arc::from(Vec::new()),
        }
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn PeerLogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn with_roots(mut self, roots: Vec<RootEntry>) -> Self {
        self.roots = Arc::from(roots);
        self
    }

    /// Run a completion for `peer`. Never fails; problems come back as text content.
    pub async fn sample(&self, peer: &str, request: Option<SamplingRequest>) -> SamplingResult {
        sampling::sample(self.completion.as_ref(), peer, request).await
    }

    /// Ask the user on behalf of `peer`. Never fails; problems cancel the request.
    pub async fn elicit(
        &self,
        peer: &str,
        request: Option<ElicitationRequest>,
    ) -> ElicitationResponse {
        elicitation::elicit(self.prompt.as_ref(), peer, request).await
    }

    /// Forward a raw `notifications/message` payload. Returns the bucket, or `None` if the
    /// payload could not be parsed.
    pub fn log_notification(&self, peer: &str, payload: &Value) -> Option<LogBucket> {
        logging::log_notification(self.log_sink.as_ref(), peer, payload)
    }

    pub fn roots(&self, _peer: &str) -> Vec<RootEntry> {
        self.roots.to_vec()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}
