//! One instance delegating to another over HTTP, both running in-process on
//! ephemeral ports.

use axum::{routing::get, Router};
use ngxtail::config::{Config, RemoteConfig, RoleSourceConfig, ServerConfig, SourcesConfig};
use ngxtail::ingest::{IngestError, Ingestor, LogRequest};
use ngxtail::source::{ArchiveCache, FilePosition, LogRole};
use ngxtail::web::{serve, AppState};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

struct Running {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn start(config: &Config) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::from_config(config).unwrap());
    let (shutdown, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        serve(listener, state, shutdown_rx).await.unwrap();
    });

    Running { addr, shutdown }
}

fn agent_config(dir: &Path, token: Option<&str>) -> Config {
    Config {
        server: ServerConfig {
            auth_token: token.map(str::to_string),
            ..ServerConfig::default()
        },
        sources: SourcesConfig {
            access: RoleSourceConfig {
                path: None,
                dir: Some(dir.to_path_buf()),
            },
            error: RoleSourceConfig::default(),
        },
        ..Config::default()
    }
}

fn delegating_config(addr: SocketAddr, token: Option<&str>) -> Config {
    Config {
        remote: Some(RemoteConfig {
            url: format!("http://{}", addr),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        }),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_delegated_poll_round_trips_positions() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("access.log"), "first\nsecond\n").unwrap();

    let agent = start(&agent_config(dir.path(), Some("shared"))).await;
    let front = start(&delegating_config(agent.addr, Some("shared"))).await;

    let positions = serde_json::to_string(&[FilePosition::new("access.log", 6)]).unwrap();
    let response = reqwest::Client::new()
        .get(format!("http://{}/api/logs", front.addr))
        .query(&[("type", "access"), ("positions", positions.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["logs"], serde_json::json!(["second"]));
    assert_eq!(
        json["positions"],
        serde_json::json!([{"filename": "access.log", "position": 13}])
    );
}

#[tokio::test]
async fn test_remote_status_passes_through() {
    let dir = TempDir::new().unwrap();

    // Wrong token: the agent answers 401 and so does the front.
    let agent = start(&agent_config(dir.path(), Some("right"))).await;
    let front = start(&delegating_config(agent.addr, Some("wrong"))).await;

    let response = reqwest::get(format!("http://{}/api/logs?type=access", front.addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Missing directory on the agent: 404 end to end.
    let missing = start(&agent_config(&dir.path().join("gone"), None)).await;
    let front = start(&delegating_config(missing.addr, None)).await;

    let response = reqwest::get(format!("http://{}/api/logs?type=access", front.addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let json: serde_json::Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_plaintext_remote_becomes_complete_batch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/api/logs", get(|| async { "line one\nline two\n" }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let ingestor = Ingestor::new(&delegating_config(addr, None), Arc::new(ArchiveCache::new())).unwrap();
    let positions = vec![FilePosition::new("access.log", 42)];
    let batch = ingestor
        .fetch(&LogRequest {
            role: LogRole::Access,
            positions: positions.clone(),
            include_archived: false,
        })
        .await
        .unwrap();

    assert_eq!(batch.logs, vec!["line one", "line two"]);
    assert_eq!(batch.positions, positions);
    assert_eq!(batch.complete, Some(true));
}

#[tokio::test]
async fn test_slow_remote_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/api/logs",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = delegating_config(addr, None);
    if let Some(remote) = config.remote.as_mut() {
        remote.timeout = Duration::from_millis(200);
    }

    let ingestor = Ingestor::new(&config, Arc::new(ArchiveCache::new())).unwrap();
    let err = ingestor.fetch(&LogRequest::default()).await.unwrap_err();

    assert!(matches!(err, IngestError::RemoteTimeout(_)));
    assert_eq!(err.status_code(), 500);
}
