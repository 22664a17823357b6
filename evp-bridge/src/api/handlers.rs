//! HTTP request handlers
//!
//! Bodies are the camelCase command messages from `evp_common::messages`.
//! Commands on unknown handles succeed without effect; invalid arguments
//! answer 400.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use evp_common::messages::{
    CreateMessage, LoopingMessage, MixWithOthersMessage, PlaybackSpeedMessage, PositionMessage,
    SessionSnapshot, TextureMessage, VolumeMessage,
};
use evp_common::Handle;
use serde::Serialize;
use tracing::{debug, error};

use crate::api::server::AppContext;
use crate::error::Error;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
    sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!("Command failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(StatusResponse {
            status: err.to_string(),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "evp-bridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: ctx.port,
        sessions: ctx.dispatcher.session_count(),
    })
}

// ============================================================================
// Player Commands
// ============================================================================

/// POST /api/v1/player/create
pub async fn create(
    State(ctx): State<AppContext>,
    Json(msg): Json<CreateMessage>,
) -> Result<Json<TextureMessage>, ApiError> {
    ctx.dispatcher.create(msg).map(Json).map_err(api_error)
}

/// POST /api/v1/player/dispose
pub async fn dispose(
    State(ctx): State<AppContext>,
    Json(msg): Json<TextureMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.dispose(msg);
    ok()
}

/// POST /api/v1/player/play
pub async fn play(
    State(ctx): State<AppContext>,
    Json(msg): Json<TextureMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.play(msg);
    ok()
}

/// POST /api/v1/player/pause
pub async fn pause(
    State(ctx): State<AppContext>,
    Json(msg): Json<TextureMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.pause(msg);
    ok()
}

/// POST /api/v1/player/seekTo
pub async fn seek_to(
    State(ctx): State<AppContext>,
    Json(msg): Json<PositionMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.seek_to(msg);
    ok()
}

/// POST /api/v1/player/position
pub async fn position(
    State(ctx): State<AppContext>,
    Json(msg): Json<TextureMessage>,
) -> Json<PositionMessage> {
    Json(ctx.dispatcher.position(msg))
}

/// POST /api/v1/player/setLooping
pub async fn set_looping(
    State(ctx): State<AppContext>,
    Json(msg): Json<LoopingMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.set_looping(msg);
    ok()
}

/// POST /api/v1/player/setVolume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(msg): Json<VolumeMessage>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.dispatcher.set_volume(msg).map_err(api_error)?;
    Ok(ok())
}

/// POST /api/v1/player/setPlaybackSpeed
pub async fn set_playback_speed(
    State(ctx): State<AppContext>,
    Json(msg): Json<PlaybackSpeedMessage>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.dispatcher.set_playback_speed(msg).map_err(api_error)?;
    Ok(ok())
}

/// POST /api/v1/player/setMixWithOthers
pub async fn set_mix_with_others(
    State(ctx): State<AppContext>,
    Json(msg): Json<MixWithOthersMessage>,
) -> Json<StatusResponse> {
    ctx.dispatcher.set_mix_with_others(msg);
    ok()
}

/// GET /api/v1/player/:texture_id
pub async fn snapshot(
    State(ctx): State<AppContext>,
    Path(texture_id): Path<i64>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    match ctx.dispatcher.snapshot(Handle(texture_id)) {
        Some(snapshot) => Ok(Json(snapshot)),
        None => {
            debug!("Snapshot requested for unknown handle {}", texture_id);
            Err(StatusCode::NOT_FOUND)
        }
    }
}
