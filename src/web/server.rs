use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::Config;

use super::api::{
    classify_user_agent, get_logs, health_check, parse_access, parse_error, require_token,
    AppState,
};

/// Build the router. Everything under `/api` sits behind the token check.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/logs", get(get_logs))
        .route("/api/classify", get(classify_user_agent))
        .route("/api/parse/access", post(parse_access))
        .route("/api/parse/error", post(parse_error))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown_rx` turns true.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&v| v).await;
            tracing::info!("Web server shutting down gracefully");
        })
        .await
}

/// Start the web server for `config`.
pub async fn run_server(
    config: &Config,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = Arc::new(AppState::from_config(config)?);

    let listener = TcpListener::bind(&config.server.listen).await?;
    tracing::info!(
        addr = %config.server.listen,
        auth = state.auth_token.is_some(),
        "Web server listening"
    );

    serve(listener, state, shutdown_rx).await?;
    Ok(())
}
