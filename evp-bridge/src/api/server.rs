//! HTTP server setup and routing

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatcher::CommandDispatcher;
use crate::error::{Error, Result};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub dispatcher: Arc<CommandDispatcher>,
    pub port: u16,
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let player = Router::new()
        .route("/create", post(super::handlers::create))
        .route("/dispose", post(super::handlers::dispose))
        .route("/play", post(super::handlers::play))
        .route("/pause", post(super::handlers::pause))
        .route("/seekTo", post(super::handlers::seek_to))
        .route("/position", post(super::handlers::position))
        .route("/setLooping", post(super::handlers::set_looping))
        .route("/setVolume", post(super::handlers::set_volume))
        .route("/setPlaybackSpeed", post(super::handlers::set_playback_speed))
        .route("/setMixWithOthers", post(super::handlers::set_mix_with_others))
        .route("/:texture_id", get(super::handlers::snapshot));

    Router::new()
        .route("/health", get(super::handlers::health))
        .nest("/api/v1/player", player)
        .route("/api/v1/events/:texture_id", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Serve the API on `addr` until `shutdown` resolves
pub async fn run(
    addr: SocketAddr,
    dispatcher: Arc<CommandDispatcher>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(AppContext {
        dispatcher,
        port: addr.port(),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
