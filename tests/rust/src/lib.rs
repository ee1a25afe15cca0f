//! Shared test utilities and fixtures for mcplink integration tests.

pub use mcplink_core::{
    CallbackRegistry, ChatMessage, ChatResponse, ElicitationAction, MemoryLogSink, PeerLogRecord,
    RootEntry,
};

/// Scripted collaborators standing in for the orchestrator's model and user
pub mod scripted {
    use async_trait::async_trait;
    use mcplink_core::{
        ChatCompletion, ChatMessage, ChatOptions, ChatResponse, ChatRole, FinishReason, UserPrompt,
    };
    use parking_lot::Mutex;

    /// Chat backend that answers every request with the same text and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedCompletion {
        reply: Option<String>,
        pub calls: Mutex<Vec<(Vec<ChatMessage>, Option<ChatOptions>)>>,
    }

    impl ScriptedCompletion {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Backend whose every call fails.
        pub fn failing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedCompletion {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            options: Option<ChatOptions>,
        ) -> anyhow::Result<ChatResponse> {
            self.calls.lock().push((messages, options));
            let Some(reply) = &self.reply else {
                anyhow::bail!("model offline");
            };
            Ok(ChatResponse {
                messages: vec![ChatMessage::text(ChatRole::Assistant, reply.as_str())],
                model_id: Some("scripted-model".to_string()),
                finish_reason: Some(FinishReason::Stop),
            })
        }
    }

    /// User that answers with a fixed reply.
    pub struct ScriptedUser {
        answer: Result<Option<String>, String>,
        pub questions: Mutex<Vec<String>>,
    }

    impl ScriptedUser {
        pub fn answering(answer: &str) -> Self {
            Self::with(Ok(Some(answer.to_string())))
        }

        pub fn silent() -> Self {
            Self::with(Ok(None))
        }

        pub fn broken() -> Self {
            Self::with(Err("terminal closed".to_string()))
        }

        fn with(answer: Result<Option<String>, String>) -> Self {
            Self {
                answer,
                questions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserPrompt for ScriptedUser {
        async fn ask(&self, _peer: &str, message: &str) -> anyhow::Result<Option<String>> {
            self.questions.lock().push(message.to_string());
            self.answer.clone().map_err(anyhow::Error::msg)
        }
    }
}

/// Client options and proxy fixtures
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use mcplink_core::{CallbackRegistry, ChatCompletion, MemoryLogSink, UserPrompt};
    use mcplink_mcp::{ClientOptions, DuplexChannel, InProcessEndpoint, LocalServer, TransportInputs};

    use crate::scripted::{ScriptedCompletion, ScriptedUser};

    /// Callbacks backed by scripted collaborators and a memory log sink.
    pub fn callbacks(
        completion: Arc<dyn ChatCompletion>,
        prompt: Arc<dyn UserPrompt>,
        sink: Arc<MemoryLogSink>,
    ) -> CallbackRegistry {
        CallbackRegistry::new(completion, prompt).with_log_sink(sink)
    }

    /// Options with a short handshake timeout so failures surface quickly.
    pub fn options(callbacks: CallbackRegistry) -> ClientOptions {
        crate::logging::init_test_tracing();
        ClientOptions::new(callbacks)
            .with_client_name("mcplink-tests")
            .with_initialization_timeout(Duration::from_secs(5))
    }

    pub fn default_options() -> ClientOptions {
        options(callbacks(
            Arc::new(ScriptedCompletion::replying("ok")),
            Arc::new(ScriptedUser::silent()),
            Arc::new(MemoryLogSink::new()),
        ))
    }

    /// Fresh in-process endpoint over the default local server.
    pub fn local_inputs() -> TransportInputs {
        TransportInputs::in_process(InProcessEndpoint::new(
            DuplexChannel::default(),
            LocalServer::with_defaults().session(),
        ))
    }
}

/// Test log capture
pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// Route tracing output through the test harness. `RUST_LOG` overrides the default filter.
    pub fn init_test_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mcplink_core=debug,mcplink_mcp=debug,rmcp=warn"));
        // a subscriber may already be installed by an earlier test in this binary
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Text helpers for tool results
pub mod content {
    use rmcp::model::CallToolResult;
    use serde_json::Value;

    /// Concatenated text of every text block in a tool result.
    pub fn result_text(result: &CallToolResult) -> String {
        let blocks = serde_json::to_value(&result.content).unwrap_or_default();
        blocks
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect()
    }
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Run an async operation with a timeout
    pub async fn with_timeout<F, T>(duration: Duration, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        timeout(duration, f).await.expect("Operation timed out")
    }

    /// Poll `check` until it holds or `duration` elapses.
    pub async fn eventually<F>(duration: Duration, mut check: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = tokio::time::Instant::now() + duration;
        while tokio::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check()
    }

    /// Default test timeout (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
}
