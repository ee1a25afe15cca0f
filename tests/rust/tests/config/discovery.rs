//! Discovery over a directory of mixed configuration files

use std::time::Duration;

use mcplink_core::{
    discover_configurations, ConfigError, HttpTransportMode, PeerTransport, TransportKind,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    std::fs::write(dir.path().join(name), content).expect("write config file");
}

#[tokio::test]
async fn test_discovers_every_schema_in_file_name_order() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "b-remote.json",
        &json!({
            "mcpServers": {
                "search": {
                    "endpoint": "https://mcp.example.com/search",
                    "useStreamableHttp": true,
                    "headers": {"Authorization": "Bearer token"},
                    "connectionTimeout": "00:00:10"
                }
            }
        })
        .to_string(),
    );
    write(
        &dir,
        "a-local.json",
        &json!({
            "servers": {
                "files": {
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
                    "env": {"DEBUG": "1", "HOME": null},
                    "cwd": "/tmp"
                },
                "embedded": {"class": "Demo.LocalServer"}
            }
        })
        .to_string(),
    );
    write(&dir, "notes.txt", "{ not json and not scanned");

    let configs = discover_configurations(dir.path()).await.unwrap();
    let kinds: Vec<(&str, TransportKind)> =
        configs.iter().map(|c| (c.name.as_str(), c.kind())).collect();

    assert_eq!(kinds.len(), 3);
    assert_eq!(kinds[2], ("search", TransportKind::Http));
    assert!(kinds[..2].contains(&("files", TransportKind::Stdio)));
    assert!(kinds[..2].contains(&("embedded", TransportKind::InProcess)));

    let files = configs.iter().find(|c| c.name == "files").unwrap();
    let stdio = files.stdio_spec().unwrap();
    assert_eq!(stdio.command, "npx");
    assert_eq!(stdio.args.len(), 3);
    assert_eq!(stdio.working_directory.as_deref(), Some("/tmp"));
    assert_eq!(stdio.environment_variables.get("DEBUG"), Some(&Some("1".to_string())));
    assert_eq!(stdio.environment_variables.get("HOME"), Some(&None));

    let search = configs.iter().find(|c| c.name == "search").unwrap();
    let http = search.http_spec().unwrap();
    assert_eq!(http.endpoint.as_str(), "https://mcp.example.com/search");
    assert_eq!(http.transport_mode, HttpTransportMode::StreamableHttp);
    assert_eq!(http.connection_timeout, Duration::from_secs(10));
    assert_eq!(
        http.additional_headers.get("Authorization").map(String::as_str),
        Some("Bearer token")
    );

    let embedded = configs.iter().find(|c| c.name == "embedded").unwrap();
    match &embedded.transport {
        PeerTransport::InProcess(spec) => assert_eq!(spec.class.as_deref(), Some("Demo.LocalServer")),
        other => panic!("expected in-process transport, got {other:?}"),
    }
}

#[tokio::test]
async fn test_relative_url_falls_through_to_in_process() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "peers.json",
        &json!({"servers": {"odd": {"url": "/relative/mcp"}}}).to_string(),
    );

    let configs = discover_configurations(dir.path()).await.unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].kind(), TransportKind::InProcess);
}

#[tokio::test]
async fn test_files_without_server_map_contribute_nothing() {
    let dir = TempDir::new().unwrap();
    write(&dir, "settings.json", &json!({"theme": "dark"}).to_string());
    write(
        &dir,
        "peers.json",
        &json!({"servers": {"echo": {"command": "echo"}, "bogus": "just a string"}}).to_string(),
    );

    let configs = discover_configurations(dir.path()).await.unwrap();
    let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["echo"]);
}

#[tokio::test]
async fn test_one_corrupt_file_fails_discovery() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.json", &json!({"servers": {"ok": {"command": "echo"}}}).to_string());
    write(&dir, "b.json", "{\"servers\": {");

    let err = discover_configurations(dir.path()).await.unwrap_err();
    match err {
        ConfigError::Json { path, .. } => assert!(path.ends_with("b.json")),
        other => panic!("expected JSON error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_field_type_names_the_peer() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "peers.json",
        &json!({"servers": {"broken": {"command": "node", "args": "server.js"}}}).to_string(),
    );

    let err = discover_configurations(dir.path()).await.unwrap_err();
    match &err {
        ConfigError::InvalidEntry { peer, .. } => assert_eq!(peer, "broken"),
        other => panic!("expected invalid entry, got {other:?}"),
    }
    assert!(err.to_string().contains("args"));
}
