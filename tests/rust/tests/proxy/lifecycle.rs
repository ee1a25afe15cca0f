//! Proxy lifecycle against the in-process peer

use mcplink_core::{PeerConfiguration, StdioSpec, TransportKind, IN_PROCESS_PEER_NAME};
use mcplink_mcp::{McpProxy, ProxyError, ProxyState, ServerStatus, TransportInputs};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::async_helpers::{with_timeout, DEFAULT_TIMEOUT};
use tests::content::result_text;
use tests::fixtures::{default_options, local_inputs};

#[tokio::test]
async fn test_in_process_proxy_serves_local_tools() {
    let mut proxy = McpProxy::new();
    let started = proxy
        .start(&default_options(), &PeerConfiguration::in_process(), local_inputs())
        .await
        .unwrap();

    assert!(started);
    assert_eq!(proxy.state(), ProxyState::Running);
    assert_eq!(proxy.name(), IN_PROCESS_PEER_NAME);
    assert_eq!(proxy.transport_kind(), Some(TransportKind::InProcess));
    assert!(proxy.error_message().is_none());

    let client = proxy.require_client().unwrap();
    let info = client.server_info().expect("handshake stores server info");
    assert_eq!(info.server_info.name, "mcplink-local");

    let mut names: Vec<String> = client
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["ask_user", "list_roots", "reverse_string", "summarize", "time_now"]
    );

    let result = client
        .call_tool("reverse_string", Some(json!({"text": "mcplink"})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "knilpcm");

    proxy.dispose().await;
    assert_eq!(proxy.state(), ProxyState::Disposed);
}

#[tokio::test]
async fn test_unknown_tool_is_a_protocol_error() {
    let mut proxy = McpProxy::new();
    proxy
        .start(&default_options(), &PeerConfiguration::in_process(), local_inputs())
        .await
        .unwrap();

    let client = proxy.require_client().unwrap();
    assert!(client.call_tool("no_such_tool", None).await.is_err());

    let bad_args = client
        .call_tool("reverse_string", Some(json!({"text": 42})))
        .await;
    assert!(bad_args.is_err());

    proxy.dispose().await;
}

#[tokio::test]
async fn test_local_prompt_renders_arguments() {
    let mut proxy = McpProxy::new();
    proxy
        .start(&default_options(), &PeerConfiguration::in_process(), local_inputs())
        .await
        .unwrap();

    let client = proxy.require_client().unwrap();
    let prompts = client.list_prompts().await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].name, "summarize_text");

    let args = json!({"text": "The quick brown fox."});
    let rendered = client
        .get_prompt("summarize_text", args.as_object().cloned())
        .await
        .unwrap();
    let rendered = serde_json::to_value(&rendered).unwrap();
    let text = rendered["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.ends_with("The quick brown fox."), "got: {text}");

    // local server advertises no resources
    assert!(client.list_resources().await.unwrap().is_empty());

    proxy.dispose().await;
}

#[tokio::test]
async fn test_server_status_follows_proxy_lifecycle() {
    let mut proxy = McpProxy::new();
    let mut status = proxy.server_status();
    assert_eq!(*status.borrow(), ServerStatus::NotStarted);

    proxy
        .start(&default_options(), &PeerConfiguration::in_process(), local_inputs())
        .await
        .unwrap();
    with_timeout(
        DEFAULT_TIMEOUT,
        status.wait_for(|s| *s == ServerStatus::Running),
    )
    .await
    .unwrap();

    proxy.dispose().await;
    with_timeout(
        DEFAULT_TIMEOUT,
        status.wait_for(|s| *s == ServerStatus::Stopped),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_start_is_single_shot() {
    let mut proxy = McpProxy::new();
    let config = PeerConfiguration::in_process();
    assert!(proxy.start(&default_options(), &config, local_inputs()).await.unwrap());
    assert!(!proxy.start(&default_options(), &config, local_inputs()).await.unwrap());
    assert_eq!(proxy.state(), ProxyState::Running);

    proxy.dispose().await;
    assert!(!proxy.start(&default_options(), &config, local_inputs()).await.unwrap());
    assert!(matches!(
        proxy.require_client(),
        Err(ProxyError::AlreadyDisposed { .. })
    ));
}

#[tokio::test]
async fn test_in_process_without_endpoint_fails() {
    let mut proxy = McpProxy::new();
    let err = proxy
        .start(&default_options(), &PeerConfiguration::in_process(), TransportInputs::none())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProxyError>(),
        Some(ProxyError::MissingInProcessEndpoint { .. })
    ));
    assert_eq!(proxy.state(), ProxyState::Failed);
    assert!(proxy.error_message().unwrap().starts_with(IN_PROCESS_PEER_NAME));
    assert!(matches!(
        proxy.require_client(),
        Err(ProxyError::NotRunning { .. })
    ));
    proxy.dispose().await;
}

#[tokio::test]
async fn test_missing_executable_fails_start() {
    let mut proxy = McpProxy::new();
    let config = PeerConfiguration::stdio(
        "ghost",
        StdioSpec::new("mcplink-definitely-not-installed-binary"),
    );

    let result = proxy
        .start(&default_options(), &config, TransportInputs::none())
        .await;

    assert!(result.is_err());
    assert_eq!(proxy.state(), ProxyState::Failed);
    assert_eq!(proxy.transport_kind(), Some(TransportKind::Stdio));
    assert!(proxy.error_message().unwrap().starts_with("ghost: "));
    assert!(proxy.client().is_none());
    proxy.dispose().await;
}
