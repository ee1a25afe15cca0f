//! Factory discovery, isolation and teardown

use std::sync::atomic::{AtomicUsize, Ordering};

use mcplink_core::{TransportKind, IN_PROCESS_PEER_NAME};
use mcplink_mcp::{FactoryState, LocalServer, ProxyFactory, ProxyState};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tests::fixtures::default_options;

fn write_config(dir: &TempDir, name: &str, servers: serde_json::Value) {
    std::fs::write(
        dir.path().join(name),
        json!({ "servers": servers }).to_string(),
    )
    .expect("write config file");
}

#[tokio::test]
async fn test_empty_directory_yields_only_local_peer() {
    let dir = TempDir::new().unwrap();
    let mut factory = ProxyFactory::new(dir.path(), LocalServer::with_defaults());

    let report = factory.start_all(|_| async { default_options() }).await.unwrap();

    assert!(report.all_started());
    assert_eq!(report.started, vec![IN_PROCESS_PEER_NAME.to_string()]);
    let clients: Vec<_> = factory.clients().collect();
    assert_eq!(clients.len(), 1);
    assert!(!clients[0].list_tools().await.unwrap().is_empty());

    factory.dispose().await;
}

#[tokio::test]
async fn test_failing_peers_do_not_affect_others() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "peers.json",
        json!({
            "missing-binary": {"command": "mcplink-definitely-not-installed-binary"},
            "closed-port": {"url": "http://127.0.0.1:1/mcp", "connectionTimeout": 2},
        }),
    );

    let calls = AtomicUsize::new(0);
    let mut factory = ProxyFactory::new(dir.path(), LocalServer::with_defaults());
    let report = factory
        .start_all(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { default_options() }
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.started, vec![IN_PROCESS_PEER_NAME.to_string()]);
    let mut failed: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["closed-port", "missing-binary"]);
    assert_eq!(factory.state(), FactoryState::Ready);

    assert_eq!(factory.proxies().len(), 3);
    assert_eq!(factory.running().count(), 1);

    let broken = factory.proxy("missing-binary").unwrap();
    assert_eq!(broken.state(), ProxyState::Failed);
    assert_eq!(broken.transport_kind(), Some(TransportKind::Stdio));
    assert!(broken.error_message().is_some());

    let remote = factory.proxy("closed-port").unwrap();
    assert_eq!(remote.transport_kind(), Some(TransportKind::Http));
    assert!(!remote.is_running());

    factory.dispose().await;
    assert_eq!(factory.state(), FactoryState::Disposed);
}

#[tokio::test]
async fn test_duplicate_names_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "a.json", json!({ IN_PROCESS_PEER_NAME: {} }));

    let mut factory = ProxyFactory::new(dir.path(), LocalServer::with_defaults());
    let report = factory.start_all(|_| async { default_options() }).await.unwrap();

    assert_eq!(report.started, vec![IN_PROCESS_PEER_NAME.to_string()]);
    assert_eq!(report.skipped, vec![IN_PROCESS_PEER_NAME.to_string()]);
    assert!(!report.all_started());
    assert_eq!(factory.proxies().len(), 1);

    factory.dispose().await;
}

#[tokio::test]
async fn test_configured_in_process_peer_gets_its_own_session() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "local.json", json!({ "helper": {"class": "Helper"} }));

    let mut factory = ProxyFactory::new(dir.path(), LocalServer::with_defaults());
    let report = factory.start_all(|_| async { default_options() }).await.unwrap();

    assert!(report.all_started());
    assert_eq!(factory.running().count(), 2);
    let helper = factory.proxy("helper").unwrap().require_client().unwrap();
    let result = helper
        .call_tool("reverse_string", Some(json!({"text": "ab"})))
        .await
        .unwrap();
    assert_eq!(tests::content::result_text(&result), "ba");

    factory.dispose().await;
}

#[tokio::test]
async fn test_corrupt_configuration_aborts_start() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

    let mut factory = ProxyFactory::new(dir.path(), LocalServer::with_defaults());
    let err = factory
        .start_all(|_| async { default_options() })
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("broken.json"));
    assert_eq!(factory.state(), FactoryState::Idle);
    assert!(factory.proxies().is_empty());
}
