use crate::config::{load_config, ConfigError};
use crate::web::run_server;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("web server error: {0}")]
    WebServer(String),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/ngxtail/config.yml");
            eprintln!("  /etc/ngxtail/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'ngxtail config init' to generate one.");
            std::process::exit(1);
        }
    };

    serve(&config_path).await.map_err(|e| e.into())
}

async fn serve(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    match &config.remote {
        Some(remote) => info!(url = %remote.url, "Delegating all log requests to remote"),
        None => info!(
            access_path = ?config.sources.access.path,
            access_dir = ?config.sources.access.dir,
            error_path = ?config.sources.error.path,
            error_dir = ?config.sources.error.dir,
            "Serving local log sources"
        ),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_config = config.clone();
    let mut web_handle = tokio::spawn(async move {
        run_server(&server_config, shutdown_rx)
            .await
            .map_err(|e| RunError::WebServer(e.to_string()))
    });

    info!("Server started, press Ctrl+C to shutdown");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            web_handle.await??;
        }
        result = &mut web_handle => {
            if let Err(e) = &result {
                error!(error = %e, "Web server task failed");
            }
            result??;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
