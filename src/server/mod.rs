//! HTTP server module for the WebSocket endpoint and roster API.

pub mod routes;
pub mod state;
pub mod ws;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::routes::{health, users, HEALTH_PATH, USERS_PATH};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;

use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the router with the WebSocket endpoint mounted at `ws_path`.
///
/// `ws_path` must pass [`ServerConfig::validate`]; axum panics on a
/// malformed or duplicate route.
pub fn router(state: Arc<AppState>, ws_path: &str) -> Router {
    // CORS layer for the browser client
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(HEALTH_PATH, get(health::health_check))
        .route(USERS_PATH, get(users::get_users))
        .route(ws_path, get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until `shutdown` resolves.
pub async fn run_server<F>(config: &ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    let state = Arc::new(AppState::new(config));
    serve(listener, router(state, &config.ws_path), shutdown).await
}

/// Serves `app` on an already-bound listener.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(local) = listener.local_addr() {
        tracing::info!("Chat relay listening on http://{}", local);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("Chat relay stopped");
    Ok(())
}
