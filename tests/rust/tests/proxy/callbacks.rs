//! Peer-to-client callbacks driven by the local tools

use std::sync::Arc;
use std::time::Duration;

use mcplink_core::{
    ChatRole, LogSeverity, MemoryLogSink, PeerConfiguration, RootEntry, IN_PROCESS_PEER_NAME,
};
use mcplink_mcp::{ClientOptions, McpProxy};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::async_helpers::eventually;
use tests::content::result_text;
use tests::fixtures::{callbacks, local_inputs, options};
use tests::scripted::{ScriptedCompletion, ScriptedUser};

const NO_ANSWER: &str = "The user did not provide an answer";

async fn started(options: &ClientOptions) -> McpProxy {
    let mut proxy = McpProxy::new();
    proxy
        .start(options, &PeerConfiguration::in_process(), local_inputs())
        .await
        .expect("in-process peer should start");
    proxy
}

#[tokio::test]
async fn test_summarize_round_trips_through_sampling() {
    let completion = Arc::new(ScriptedCompletion::replying("A fox jumped."));
    let opts = options(callbacks(
        completion.clone(),
        Arc::new(ScriptedUser::silent()),
        Arc::new(MemoryLogSink::new()),
    ));
    let mut proxy = started(&opts).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("summarize", Some(json!({"text": "The quick brown fox jumps."})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "A fox jumped.");
    assert_ne!(result.is_error, Some(true));

    let calls = completion.calls.lock();
    assert_eq!(calls.len(), 1);
    let (messages, options) = &calls[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[1].joined_text(), "The quick brown fox jumps.");
    assert_eq!(options.as_ref().and_then(|o| o.max_output_tokens), Some(512));
    drop(calls);

    proxy.dispose().await;
}

#[tokio::test]
async fn test_sampling_failure_is_reported_in_band() {
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::failing()),
        Arc::new(ScriptedUser::silent()),
        Arc::new(MemoryLogSink::new()),
    ));
    let mut proxy = started(&opts).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("summarize", Some(json!({"text": "anything"})))
        .await
        .unwrap();
    let text = result_text(&result);
    assert!(text.contains("model offline"), "got: {text}");

    proxy.dispose().await;
}

#[tokio::test]
async fn test_ask_user_returns_the_answer() {
    let user = Arc::new(ScriptedUser::answering("blue"));
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::replying("unused")),
        user.clone(),
        Arc::new(MemoryLogSink::new()),
    ));
    let mut proxy = started(&opts).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("ask_user", Some(json!({"question": "Favourite colour?"})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "blue");
    assert_eq!(user.questions.lock().clone(), vec!["Favourite colour?".to_string()]);

    proxy.dispose().await;
}

#[tokio::test]
async fn test_ask_user_empty_answer_is_accepted() {
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::replying("unused")),
        Arc::new(ScriptedUser::answering("")),
        Arc::new(MemoryLogSink::new()),
    ));
    let mut proxy = started(&opts).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("ask_user", Some(json!({"question": "Anything to add?"})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "");

    proxy.dispose().await;
}

#[tokio::test]
async fn test_ask_user_without_input_cancels() {
    for user in [ScriptedUser::silent(), ScriptedUser::broken()] {
        let opts = options(callbacks(
            Arc::new(ScriptedCompletion::replying("unused")),
            Arc::new(user),
            Arc::new(MemoryLogSink::new()),
        ));
        let mut proxy = started(&opts).await;

        let result = proxy
            .require_client()
            .unwrap()
            .call_tool("ask_user", Some(json!({"question": "Still there?"})))
            .await
            .unwrap();
        assert_eq!(result_text(&result), NO_ANSWER);

        proxy.dispose().await;
    }
}

#[tokio::test]
async fn test_list_roots_reports_configured_roots() {
    let registry = callbacks(
        Arc::new(ScriptedCompletion::replying("unused")),
        Arc::new(ScriptedUser::silent()),
        Arc::new(MemoryLogSink::new()),
    )
    .with_roots(vec![
        RootEntry::new("repo", "file:///work/repo"),
        RootEntry::new("docs", "file:///work/docs"),
    ]);
    let mut proxy = started(&options(registry)).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("list_roots", None)
        .await
        .unwrap();
    assert_eq!(
        result_text(&result),
        "repo: file:///work/repo\ndocs: file:///work/docs"
    );

    proxy.dispose().await;
}

#[tokio::test]
async fn test_list_roots_without_roots() {
    let mut proxy = started(&tests::fixtures::default_options()).await;

    let result = proxy
        .require_client()
        .unwrap()
        .call_tool("list_roots", Some(json!({})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "No roots");

    proxy.dispose().await;
}

#[tokio::test]
async fn test_log_notifications_reach_the_sink_after_set_level() {
    let sink = Arc::new(MemoryLogSink::new());
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::replying("Short.")),
        Arc::new(ScriptedUser::silent()),
        sink.clone(),
    ))
    .with_log_level(LogSeverity::Debug);
    let mut proxy = started(&opts).await;

    let client = proxy.require_client().unwrap();
    client
        .call_tool("reverse_string", Some(json!({"text": "abc"})))
        .await
        .unwrap();
    client
        .call_tool("summarize", Some(json!({"text": "abc"})))
        .await
        .unwrap();

    assert!(eventually(Duration::from_secs(5), || sink.len() >= 2).await);
    let records = sink.records();
    assert!(records.iter().all(|r| r.peer == IN_PROCESS_PEER_NAME));
    assert!(records
        .iter()
        .any(|r| r.severity == LogSeverity::Debug && r.data == json!({"chars": 3})));
    assert!(records.iter().any(|r| r.severity == LogSeverity::Info));

    proxy.dispose().await;
}

#[tokio::test]
async fn test_no_log_notifications_without_set_level() {
    let sink = Arc::new(MemoryLogSink::new());
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::replying("Short.")),
        Arc::new(ScriptedUser::silent()),
        sink.clone(),
    ));
    let mut proxy = started(&opts).await;

    proxy
        .require_client()
        .unwrap()
        .call_tool("reverse_string", Some(json!({"text": "abc"})))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.is_empty());

    proxy.dispose().await;
}

#[tokio::test]
async fn test_set_level_filters_lower_severities() {
    let sink = Arc::new(MemoryLogSink::new());
    let opts = options(callbacks(
        Arc::new(ScriptedCompletion::replying("Short.")),
        Arc::new(ScriptedUser::silent()),
        sink.clone(),
    ))
    .with_log_level(LogSeverity::Warning);
    let mut proxy = started(&opts).await;

    let client = proxy.require_client().unwrap();
    client
        .call_tool("reverse_string", Some(json!({"text": "abc"})))
        .await
        .unwrap();
    client
        .call_tool("summarize", Some(json!({"text": "abc"})))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.is_empty());

    proxy.dispose().await;
}
