//! Per-session SSE endpoint

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
};
use evp_common::sse::create_session_sse_stream;
use evp_common::Handle;
use futures::stream::Stream;
use tracing::debug;

use crate::api::server::AppContext;

/// GET /api/v1/events/:texture_id
///
/// Attaching replaces any earlier subscriber of the same session. The stream
/// ends when the session is disposed.
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Path(texture_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let handle = Handle(texture_id);

    match ctx.dispatcher.subscribe(handle) {
        Some(rx) => Ok(create_session_sse_stream(handle, rx)),
        None => {
            debug!("SSE requested for unknown handle {}", handle);
            Err(StatusCode::NOT_FOUND)
        }
    }
}
